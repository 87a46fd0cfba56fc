//! Outline tracing through an external tool (potrace by default).
//!
//! The mask bitmap and the traced SVG live in a per-call scratch directory
//! that is removed when the guard drops, whichever way the call exits.

use std::{fs, io, path::Path};

use image::{DynamicImage, GrayImage, ImageFormat};
use tempfile::TempDir;

use super::{ConvertError, TargetFormat, load, mask::build_mask};
use crate::config::TraceConfig;
use crate::debug;
use crate::utils::exec::{Cmd, ExecError};

const MASK_FILE: &str = "mask.bmp";
const TRACE_FILE: &str = "trace.svg";

/// Trace `image` into SVG bytes.
pub fn trace(image: &DynamicImage, config: &TraceConfig) -> Result<Vec<u8>, ConvertError> {
    let mask = build_mask(image, config.mask, config.threshold)?;

    let scratch = scratch_dir(config)?;
    let input = scratch.path().join(MASK_FILE);
    let output = scratch.path().join(TRACE_FILE);

    write_bitmap(&mask, &input)?;
    debug!("trace"; "{} -> {}", load::describe(image), input.display());

    run_tracer(config, &input, &output)?;

    fs::read(&output).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => {
            ConvertError::ToolExecution("tool exited successfully but wrote no SVG".into())
        }
        _ => ConvertError::Io(err),
    })
}

/// Unique scratch directory under `trace.temp_dir` or the OS temp dir.
fn scratch_dir(config: &TraceConfig) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pixtrace-");
    match &config.temp_dir {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
}

/// Save the mask as an uncompressed BMP.
fn write_bitmap(mask: &GrayImage, path: &Path) -> Result<(), ConvertError> {
    let mut buf = io::Cursor::new(Vec::new());
    mask.write_to(&mut buf, ImageFormat::Bmp)
        .map_err(|cause| ConvertError::Encode {
            format: TargetFormat::Bmp,
            cause,
        })?;
    fs::write(path, buf.into_inner())?;
    Ok(())
}

/// Run `<command> [args] -s <input> -o <output>`.
fn run_tracer(config: &TraceConfig, input: &Path, output: &Path) -> Result<(), ConvertError> {
    Cmd::from_slice(&config.command)
        .args(&config.args)
        .arg("-s")
        .arg(input)
        .arg("-o")
        .arg(output)
        .timeout(config.timeout())
        .run()
        .map(|_| ())
        .map_err(|err| match err {
            ExecError::NotFound { program } => ConvertError::ToolMissing(program),
            ExecError::TimedOut { timeout, .. } => ConvertError::ToolTimeout(timeout),
            ExecError::Failed { stderr, status, .. } if stderr.is_empty() => {
                ConvertError::ToolExecution(format!("tool exited with {status}"))
            }
            ExecError::Failed { stderr, .. } => ConvertError::ToolExecution(stderr),
            other => ConvertError::ToolExecution(other.to_string()),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::MaskSource;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    pub const FAKE_SVG: &str = "<?xml version=\"1.0\" standalone=\"no\"?>\n\
        <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"10\">\
        <path d=\"M0 0h10v10h-10z\"/></svg>\n";

    /// Write a shell script standing in for potrace.
    ///
    /// It copies the mask to `<output>.bmp` so tests can inspect it, then
    /// writes a fixed SVG to the `-o` path.
    pub fn fake_tracer(dir: &Path) -> Vec<String> {
        let script = dir.join("fake-potrace.sh");
        let body = format!(
            "#!/bin/sh\n\
             input=\"\"; output=\"\"\n\
             while [ $# -gt 0 ]; do\n\
               case \"$1\" in\n\
                 -s) input=\"$2\"; shift 2 ;;\n\
                 -o) output=\"$2\"; shift 2 ;;\n\
                 *) shift ;;\n\
               esac\n\
             done\n\
             [ -f \"$input\" ] || {{ echo \"missing input $input\" >&2; exit 2; }}\n\
             cp \"$input\" \"$output.bmp\"\n\
             cat > \"$output\" <<'EOF'\n{FAKE_SVG}EOF\n"
        );
        fs::write(&script, body).unwrap();
        vec!["sh".into(), script.display().to_string()]
    }

    /// Shell command that fails with a diagnostic.
    pub fn failing_tracer(dir: &Path) -> Vec<String> {
        let script = dir.join("failing-potrace.sh");
        fs::write(&script, "#!/bin/sh\necho 'potrace: bad bitmap' >&2\nexit 1\n").unwrap();
        vec!["sh".into(), script.display().to_string()]
    }

    fn config_with(command: Vec<String>, temp_dir: PathBuf) -> TraceConfig {
        TraceConfig {
            command,
            temp_dir: Some(temp_dir),
            ..TraceConfig::default()
        }
    }

    fn framed_square() -> DynamicImage {
        // Opaque red border, fully transparent center
        RgbaImage::from_fn(10, 10, |x, y| {
            if (2..8).contains(&x) && (2..8).contains(&y) {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 255])
            }
        })
        .into()
    }

    fn is_empty_dir(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[cfg(unix)]
    #[test]
    fn trace_returns_svg_and_cleans_up() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let config = config_with(fake_tracer(tools.path()), scratch.path().to_path_buf());

        let svg = trace(&framed_square(), &config).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<path"));
        assert!(is_empty_dir(scratch.path()));
    }

    #[cfg(unix)]
    #[test]
    fn tool_failure_carries_stderr_and_cleans_up() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let config = config_with(failing_tracer(tools.path()), scratch.path().to_path_buf());

        let err = trace(&framed_square(), &config).unwrap_err();
        match &err {
            ConvertError::ToolExecution(msg) => assert!(msg.contains("bad bitmap"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(is_empty_dir(scratch.path()));
    }

    #[cfg(unix)]
    #[test]
    fn tool_without_output_is_an_execution_error() {
        let scratch = tempfile::tempdir().unwrap();
        let config = config_with(vec!["true".into()], scratch.path().to_path_buf());

        let err = trace(&framed_square(), &config).unwrap_err();
        assert!(matches!(err, ConvertError::ToolExecution(_)));
        assert!(is_empty_dir(scratch.path()));
    }

    #[cfg(unix)]
    #[test]
    fn hanging_tool_is_killed() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let script = tools.path().join("hang.sh");
        fs::write(&script, "#!/bin/sh\nexec sleep 10\n").unwrap();

        let config = TraceConfig {
            timeout_secs: 1,
            ..config_with(
                vec!["sh".into(), script.display().to_string()],
                scratch.path().to_path_buf(),
            )
        };

        let err = trace(&framed_square(), &config).unwrap_err();
        assert!(matches!(err, ConvertError::ToolTimeout(_)));
        assert!(is_empty_dir(scratch.path()));
    }

    #[test]
    fn missing_tool_is_distinct() {
        let scratch = tempfile::tempdir().unwrap();
        let config = config_with(
            vec!["pixtrace-no-such-tracer".into()],
            scratch.path().to_path_buf(),
        );

        let err = trace(&framed_square(), &config).unwrap_err();
        assert!(matches!(err, ConvertError::ToolMissing(ref p) if p == "pixtrace-no-such-tracer"));
        assert!(is_empty_dir(scratch.path()));
    }

    #[test]
    fn strict_mask_fails_before_touching_disk() {
        let scratch = tempfile::tempdir().unwrap();
        let config = TraceConfig {
            mask: MaskSource::Alpha,
            ..config_with(vec!["pixtrace-no-such-tracer".into()], scratch.path().to_path_buf())
        };
        let opaque: DynamicImage = image::RgbImage::new(4, 4).into();

        let err = trace(&opaque, &config).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedInput(_)));
        assert!(is_empty_dir(scratch.path()));
    }

    #[cfg(unix)]
    #[test]
    fn tool_receives_black_shape_on_white() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        // Point `-o` somewhere that survives, via a wrapper that rewrites it
        let wrapper = tools.path().join("keep.sh");
        let inner = fake_tracer(tools.path());
        fs::write(
            &wrapper,
            format!(
                "#!/bin/sh\nsh '{}' \"$@\"\nfor a in \"$@\"; do last=\"$a\"; done\ncp \"$last.bmp\" '{}'\n",
                inner[1],
                out_dir.path().join("seen.bmp").display()
            ),
        )
        .unwrap();

        let config = config_with(
            vec!["sh".into(), wrapper.display().to_string()],
            scratch.path().to_path_buf(),
        );
        trace(&framed_square(), &config).unwrap();

        let seen = image::open(out_dir.path().join("seen.bmp")).unwrap().to_luma8();
        assert_eq!(seen.get_pixel(0, 0)[0], 0);
        assert_eq!(seen.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn real_potrace_when_available() {
        if which::which("potrace").is_err() {
            return;
        }
        let svg = trace(&framed_square(), &TraceConfig::default()).unwrap();
        let text = String::from_utf8_lossy(&svg);
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<path"));
    }
}
