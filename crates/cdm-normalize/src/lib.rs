//! Value normalization: dates, numbers and coded values from raw text.

pub mod code;
pub mod date;
pub mod number;
pub mod text;

pub use code::{is_checked, parse_flag, parse_outcome, parse_relatedness};
pub use date::{canonical, format_date, parse_date, parse_date_outcome};
pub use number::{parse_number, parse_number_outcome};
pub use text::{is_blank, is_unknown_token, normalize_text};
