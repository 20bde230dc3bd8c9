use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use miri_stream::{ArgInfo, RxStream, StreamConfig};
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    stream_formats: Vec<&'static str>,
    native_format: &'static str,
    native_full_scale: f64,
    default_mtu: usize,
    stream_args: Vec<ArgInfo>,
}

pub fn execute(args: InfoArgs) -> i32 {
    let (native_format, native_full_scale) = RxStream::native_format();
    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        stream_formats: RxStream::stream_formats(),
        native_format,
        native_full_scale,
        default_mtu: StreamConfig::default().mtu(),
        stream_args: StreamConfig::arg_info(),
    };

    if args.json {
        return output::print_json(&info);
    }

    println!("miri-stream CLI v{}", info.cli_version);
    println!("Stream formats: {}", info.stream_formats.join(", "));
    println!(
        "Native format: {} (full scale {})",
        info.native_format, info.native_full_scale
    );
    println!("Default MTU: {} elements", info.default_mtu);
    println!();
    println!("Stream arguments:");
    for arg in &info.stream_args {
        println!(
            "  {:<12} {:<14} default {:>6} {:<8} {}",
            arg.key, arg.name, arg.value, arg.units, arg.description
        );
    }

    exit_codes::SUCCESS
}
