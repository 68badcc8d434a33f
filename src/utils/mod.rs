pub mod external_tools;
pub mod output_file;
pub(crate) mod progress_bar_builder;
