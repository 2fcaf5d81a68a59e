//! Iterative capacity-constrained transit passenger assignment.
//!
//! Assigns passengers to paths and scheduled vehicles, then repeatedly
//! evicts ("bumps") passengers from over-capacity boardings and re-searches
//! just those passengers until the capacity gap converges or the iteration
//! budget runs out. Path search itself is an external capability invoked
//! per passenger, fanned out over a pool of workers that each own a private
//! copy of the network supply.

pub mod assignment;
pub mod bumping;
pub mod demand;
pub mod dispatch;
pub mod domain;
pub mod loading;
pub mod report;
pub mod search;
