use crate::cli::CaptureArgs;
use crate::exit_codes;
use crate::output;
use miri_stream::config::{KEY_BUFFER_LENGTH, KEY_NUM_BUFFERS};
use miri_stream::types::DIRECTION_RX;
use miri_stream::{Outcome, RxStream, StreamStats, SyntheticTransport};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct CaptureSummary {
    elements: usize,
    reads: u64,
    fragmented_reads: u64,
    timeouts: u64,
    overflows: u64,
    elapsed_ms: f64,
    buffer_length: usize,
    num_buffers: usize,
    mtu: usize,
    output: Option<String>,
    stats: StreamStats,
}

pub fn execute(args: CaptureArgs) -> i32 {
    if args.chunk == 0 {
        eprintln!("Error: --chunk must be greater than zero");
        return exit_codes::USAGE_ERROR;
    }

    let mut stream_args = HashMap::new();
    if let Some(value) = &args.bufflen {
        stream_args.insert(KEY_BUFFER_LENGTH.to_string(), value.clone());
    }
    if let Some(value) = &args.buffers {
        stream_args.insert(KEY_NUM_BUFFERS.to_string(), value.clone());
    }

    let mut transport = SyntheticTransport::new();
    if let Some(bytes) = args.burst_bytes {
        transport = transport.with_burst_bytes(bytes);
    }
    if args.pace_us > 0 {
        transport = transport.with_pace(Duration::from_micros(args.pace_us));
    }

    let mut stream = match RxStream::setup(
        Arc::new(transport),
        DIRECTION_RX,
        "CF32",
        &[0],
        &stream_args,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::USAGE_ERROR;
        }
    };

    let mut writer = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                eprintln!("Error: Failed to create output file '{}': {}", path, e);
                return exit_codes::EXECUTION_ERROR;
            }
        },
        None => None,
    };

    if let Err(e) = stream.activate() {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    let timeout = Duration::from_micros(args.timeout_us);
    let mut dst = vec![0.0f32; args.chunk * 2];
    let mut captured = 0usize;
    let mut reads = 0u64;
    let mut fragmented_reads = 0u64;
    let mut timeouts = 0u64;
    let mut overflows = 0u64;
    let mut consecutive_timeouts = 0u32;
    let started = Instant::now();

    while captured < args.elements {
        let wanted = args.chunk.min(args.elements - captured);
        let outcome = match stream.read(&mut dst, wanted, timeout) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        };

        match outcome {
            Outcome::Ready(chunk) => {
                consecutive_timeouts = 0;
                reads += 1;
                if chunk.more_fragments {
                    fragmented_reads += 1;
                }
                if let Some(writer) = writer.as_mut() {
                    let bytes: Vec<u8> = dst[..chunk.elements * 2]
                        .iter()
                        .flat_map(|v| v.to_le_bytes())
                        .collect();
                    if let Err(e) = writer.write_all(&bytes) {
                        eprintln!("Error: Failed to write samples: {}", e);
                        return exit_codes::EXECUTION_ERROR;
                    }
                }
                captured += chunk.elements;
            }
            Outcome::Timeout => {
                timeouts += 1;
                consecutive_timeouts += 1;
                if consecutive_timeouts >= args.max_timeouts {
                    eprintln!(
                        "Error: no data after {} consecutive timeouts",
                        consecutive_timeouts
                    );
                    return exit_codes::EXECUTION_ERROR;
                }
            }
            Outcome::Overflow => {
                overflows += 1;
                log::info!("Overflow reported, continuing");
            }
        }
    }

    let elapsed = started.elapsed();
    if let Err(e) = stream.deactivate() {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }
    if let Some(mut writer) = writer {
        if let Err(e) = writer.flush() {
            eprintln!("Error: Failed to write samples: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let summary = CaptureSummary {
        elements: captured,
        reads,
        fragmented_reads,
        timeouts,
        overflows,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        buffer_length: stream.config().buffer_length,
        num_buffers: stream.config().num_buffers,
        mtu: stream.mtu(),
        output: args.output.clone(),
        stats: stream.stats(),
    };

    if args.json {
        return output::print_json(&summary);
    }

    println!(
        "Captured {} elements in {} reads ({:.1} ms)",
        summary.elements, summary.reads, summary.elapsed_ms
    );
    println!(
        "Ring: {} slots x {} bytes, MTU {} elements",
        summary.num_buffers, summary.buffer_length, summary.mtu
    );
    println!(
        "Bursts: {} produced, {} dropped, {} overflow reports, {} timeouts",
        summary.stats.bursts_produced,
        summary.stats.bursts_dropped,
        summary.overflows,
        summary.timeouts
    );
    if let Some(path) = &summary.output {
        println!("Samples written to {}", path);
    }

    exit_codes::SUCCESS
}
