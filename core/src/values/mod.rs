pub mod function;
pub mod record;
pub mod value;

pub use function::{Arguments, NativeFn, NativeFunction};
pub use record::Record;
pub use value::{CapabilityRef, MAX_VALUE_SIZE, Value};
