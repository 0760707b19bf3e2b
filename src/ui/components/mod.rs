mod confirm;
mod form;
mod input;
mod key_result;
mod status_picker;

pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use form::{Form, FormEvent};
pub use input::TextInput;
pub use key_result::KeyResult;
pub use status_picker::{StatusPicker, StatusPickerEvent};
