pub mod csv_read;
pub mod sheet;
pub mod source;
