/*!
 * Handle Manager
 * Lifecycle of process-backed streams for open virtual files
 */

mod stream;
mod table;

pub use stream::{CommandStream, Direction};
pub use table::HandleTable;
