pub mod buffer;
pub mod debounce;
pub mod model;
pub mod remote;
pub mod sync;
pub mod tui_shell;

pub use buffer::EditBuffer;
pub use model::{FieldEdit, RecordId, Status, TestCase, TestCaseUpdate};
pub use remote::{RecordStore, StoreClient};
pub use sync::{SyncEngine, SyncOptions, WriteState};
