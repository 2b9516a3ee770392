/*!
 * Subtitle timing.
 *
 * - `model`: subtitle lines and showing snapshots
 * - `collection`: interval lookup over a sorted line list
 * - `edge`: once-per-line started/stopping detection
 * - `surrounding`: context windows and text extraction for mined lines
 * - `engine`: the polled timing engine tying the above together
 */

pub use self::engine::{Tick, TimingEngine, TimingOptions};
pub use self::model::{ImageDescriptor, ShowingSnapshot, Subtitle};

pub mod collection;
pub mod edge;
pub mod engine;
pub mod model;
pub mod surrounding;
