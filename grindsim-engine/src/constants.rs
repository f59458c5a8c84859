//! Centralized timing constants for the grindsim trial engine.
//!
//! These values define the fixed pacing of both simulators. Keeping them
//! together means a balance change is a reviewed code change rather than a
//! runtime knob.

use crate::time::SimTime;

// Fighting -----------------------------------------------------------------
/// Hard ceiling on a single fighting trial (5 hours).
pub const FIGHT_CEILING: SimTime = SimTime::from_secs(5 * 60 * 60);
/// Delay between killing an enemy and the next one appearing.
pub const RESPAWN_DELAY: SimTime = SimTime::from_secs(3);

// Thieving -----------------------------------------------------------------
/// Hard ceiling on a single thieving trial (8 hours).
pub const THEFT_CEILING: SimTime = SimTime::from_secs(8 * 60 * 60);
/// Base clock increment between thieving checks.
pub const THEFT_TICK: SimTime = SimTime::from_millis(100);
/// Stun applied after a failed theft, replacing the base tick.
pub const STUN_PENALTY: SimTime = SimTime::from_secs(3);

// Aggregation --------------------------------------------------------------
/// Default tail window as a share of the batch (100 of 5 000 trials).
pub const DEFAULT_TAIL_FRACTION: f64 = 0.02;
/// Trial count used when callers do not ask for one.
pub const DEFAULT_TRIALS: usize = 5_000;
/// Most result slots reserved up front for one run. Larger runs grow on
/// demand so a huge trial count cannot abort on allocation.
pub const MAX_PREALLOCATED_RESULTS: usize = 1 << 16;
