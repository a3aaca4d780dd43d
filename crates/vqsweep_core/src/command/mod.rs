//! Pure construction of external-tool argument vectors.

pub mod builder;
pub mod metric;

pub use builder::{
    build_encode_args, format_control_value, output_extension, output_path, output_stem,
    strip_rate_control, tokenize_params, ParamToken,
};
pub use metric::{build_metric_args, build_metric_args_for, metric_filter, metric_log_name};
