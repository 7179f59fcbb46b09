//! CLI output formatting.
//!
//! Every function here is pure: it takes pipeline data and returns display
//! lines, and `main.rs` does the printing. That keeps the wording testable
//! without capturing stdout.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! Processing 3 images: resize 1500x1500, square-extend, remove background → JPEG
//! 001 beach.png
//!     PNG, 4000x3000 → 1500x1500
//!     Saved: beach.jpg
//! 002 night.tiff
//!     Failed (remove background): background removal failed: ...
//! ```
//!
//! ## Check
//!
//! ```text
//! beach.png
//!     PNG, 4000x3000
//! ```
//!
//! The `<FORMAT>, <W>x<H>` line is the caption shown under each image.

use crate::imaging::ImageInfo;
use crate::imaging::codec::format_name;
use crate::process::{BatchResult, ProcessEvent};
use crate::types::OperationSelection;

/// Four spaces per level.
pub fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Three-digit positional index plus name, e.g. `"002 night.tiff"`.
fn image_line(index: usize, filename: &str) -> String {
    format!("{:03} {}", index, filename)
}

/// Human-readable list of the selected steps, in execution order.
pub fn describe_selection(selection: &OperationSelection) -> String {
    if selection.is_passthrough() {
        return "convert only".to_string();
    }
    let mut steps = Vec::new();
    if let Some(target) = selection.resize {
        steps.push(format!("resize {target}"));
    }
    if selection.shape != crate::types::Shape::None {
        steps.push(selection.shape.label().to_string());
    }
    if selection.remove_background {
        steps.push("remove background".to_string());
    }
    steps.join(", ")
}

/// Caption for one image: `"<FORMAT>, <W>x<H>"`.
pub fn format_image_info(info: &ImageInfo) -> String {
    format!("{}, {}x{}", format_name(info.format), info.width, info.height)
}

// ============================================================================
// Process output
// ============================================================================

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted {
            image_count,
            options,
        } => vec![format!(
            "Processing {} images: {} \u{2192} {}",
            image_count,
            describe_selection(&options.selection),
            options.format
        )],
        ProcessEvent::ImageProcessed {
            index,
            filename,
            source_format,
            original_size,
            output_size,
            entry_name,
        } => vec![
            image_line(*index, filename),
            format!(
                "{}{}, {}x{} \u{2192} {}x{}",
                indent(1),
                source_format,
                original_size.0,
                original_size.1,
                output_size.0,
                output_size.1
            ),
            format!("{}Saved: {}", indent(1), entry_name),
        ],
        ProcessEvent::ImageFailed {
            index,
            filename,
            failure,
        } => vec![
            image_line(*index, filename),
            format!(
                "{}Failed ({}): {}",
                indent(1),
                failure.stage,
                failure.error
            ),
        ],
    }
}

/// Closing summary after a batch.
pub fn format_batch_summary(result: &BatchResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{} of {} images processed, {} failed",
        result.succeeded_count(),
        result.len(),
        result.failed_count()
    )];
    for (filename, failure) in result.failures() {
        lines.push(format!("{}{}: {}", indent(1), filename, failure));
    }
    lines
}

// ============================================================================
// Check output
// ============================================================================

/// Format the `check` listing: one entry per input, caption or error below it.
pub fn format_check_output(entries: &[(String, Result<ImageInfo, String>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (filename, info) in entries {
        lines.push(filename.clone());
        match info {
            Ok(info) => lines.push(format!("{}{}", indent(1), format_image_info(info))),
            Err(e) => lines.push(format!("{}Error: {}", indent(1), e)),
        }
    }
    lines
}
