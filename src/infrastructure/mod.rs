pub mod js_executor;
pub mod scripts;

pub use js_executor::JsExecutor;
