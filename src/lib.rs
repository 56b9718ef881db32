#[macro_export]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		#[cfg(debug_assertions)]
		{
			eprintln!($($arg)*);
		}
	}};
}

pub mod concat;
pub mod config;
pub mod error;
pub mod grouper;
pub mod overlap;
pub mod parser;
pub mod scanner;
pub mod slicer;
pub mod writer;
