//! Test harness for `layout_decoder`: a fake debuggee whose heap is filled
//! with hand-built EASTL container layouts.

mod layouts;
mod process;

pub use process::FakeProcess;
