//! Built-in functions available to plugins.
//!
//! Plugins cannot touch the file system or the process stdio directly. The
//! driver binds an invocation context (working directory, and for interactors
//! the channel to the solution) for the duration of each plugin call, and the
//! native functions below resolve against it.

use std::cell::RefCell;
use std::io::{self, BufRead, Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use starlark::environment::GlobalsBuilder;
use starlark::starlark_module;
use starlark::values::none::NoneType;
use starlark::PrintHandler;

use super::convert::{bytes_to_text, display_text, text_to_bytes};

/// Byte streams connecting an interactor to the process under test
pub struct SolutionChannel {
    to_solution: Box<dyn Write>,
    from_solution: Box<dyn BufRead>,
}

impl SolutionChannel {
    pub fn new(to_solution: impl Write + 'static, from_solution: impl BufRead + 'static) -> Self {
        Self {
            to_solution: Box::new(to_solution),
            from_solution: Box::new(from_solution),
        }
    }

    /// The current process's own stdout/stdin
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stdin().lock())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.to_solution.write_all(data)
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.to_solution.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        self.flush()?;
        let mut line = Vec::new();
        self.from_solution.read_until(b'\n', &mut line)?;
        Ok(bytes_to_text(&line))
    }

    fn read_to_end(&mut self) -> io::Result<String> {
        self.flush()?;
        let mut data = Vec::new();
        self.from_solution.read_to_end(&mut data)?;
        Ok(bytes_to_text(&data))
    }
}

struct InvocationContext {
    work_dir: PathBuf,
    channel: Option<SolutionChannel>,
}

thread_local! {
    static CONTEXT: RefCell<Option<InvocationContext>> = const { RefCell::new(None) };
}

/// Run `f` with the invocation context bound, handing the channel back afterwards
pub(crate) fn with_context<R>(
    work_dir: &Path,
    channel: Option<SolutionChannel>,
    f: impl FnOnce() -> R,
) -> (R, Option<SolutionChannel>) {
    let previous = CONTEXT.with(|ctx| {
        ctx.borrow_mut().replace(InvocationContext {
            work_dir: work_dir.to_path_buf(),
            channel,
        })
    });
    let result = f();
    let current = CONTEXT.with(|ctx| std::mem::replace(&mut *ctx.borrow_mut(), previous));
    (result, current.and_then(|ctx| ctx.channel))
}

fn with_work_dir<R>(f: impl FnOnce(&Path) -> anyhow::Result<R>) -> anyhow::Result<R> {
    CONTEXT.with(|ctx| {
        let ctx = ctx.borrow();
        let ctx = ctx
            .as_ref()
            .ok_or_else(|| anyhow!("no working directory is bound"))?;
        f(&ctx.work_dir)
    })
}

fn with_channel<R>(f: impl FnOnce(&mut SolutionChannel) -> io::Result<R>) -> anyhow::Result<R> {
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        let channel = ctx
            .as_mut()
            .and_then(|ctx| ctx.channel.as_mut())
            .ok_or_else(|| anyhow!("no solution is attached"))?;
        f(channel).context("solution stream failed")
    })
}

/// Join a plugin-supplied relative path onto `base`, refusing anything that escapes it
pub(crate) fn enclosed_path(base: &Path, relative: &str) -> anyhow::Result<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() {
        bail!("empty path");
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("path {:?} must stay inside the working directory", relative),
        }
    }
    Ok(base.join(relative))
}

/// Destination of plugin `print()` output
pub(crate) enum Diagnostics {
    /// Straight to stdout
    Stdout,
    /// Collected, returned to the driver as the outcome diagnostic
    Capture(RefCell<Vec<String>>),
}

impl Diagnostics {
    pub(crate) fn capture() -> Self {
        Diagnostics::Capture(RefCell::new(Vec::new()))
    }

    /// Drain captured lines
    pub(crate) fn take(&self) -> Option<String> {
        match self {
            Diagnostics::Stdout => None,
            Diagnostics::Capture(lines) => {
                let lines = std::mem::take(&mut *lines.borrow_mut());
                (!lines.is_empty()).then(|| lines.join("\n"))
            }
        }
    }
}

impl PrintHandler for Diagnostics {
    fn println(&self, text: &str) -> anyhow::Result<()> {
        let text = display_text(text);
        match self {
            Diagnostics::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", text)?;
                out.flush()?;
            }
            Diagnostics::Capture(lines) => lines.borrow_mut().push(text),
        }
        Ok(())
    }
}

#[starlark_module]
pub(crate) fn register_file_functions(builder: &mut GlobalsBuilder) {
    /// Reads a file relative to the working directory, as a byte string.
    fn read_file(path: &str) -> anyhow::Result<String> {
        with_work_dir(|dir| {
            let full = enclosed_path(dir, path)?;
            let data = std::fs::read(&full).with_context(|| format!("cannot read {}", path))?;
            Ok(bytes_to_text(&data))
        })
    }

    /// Tells whether a path relative to the working directory exists.
    fn file_exists(path: &str) -> anyhow::Result<bool> {
        with_work_dir(|dir| Ok(enclosed_path(dir, path)?.exists()))
    }
}

#[starlark_module]
pub(crate) fn register_byte_functions(builder: &mut GlobalsBuilder) {
    /// UTF-8 encoding of `text`, as a byte string.
    fn encode_utf8(text: &str) -> anyhow::Result<String> {
        Ok(bytes_to_text(text.as_bytes()))
    }

    /// Text decoded from a UTF-8 byte string; invalid sequences become U+FFFD.
    fn decode_utf8(data: &str) -> anyhow::Result<String> {
        let bytes = text_to_bytes(data).ok_or_else(|| anyhow!("decode_utf8() expects a byte string"))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[starlark_module]
pub(crate) fn register_interaction_functions(builder: &mut GlobalsBuilder) {
    fn solution_write(data: &str) -> anyhow::Result<NoneType> {
        let bytes = text_to_bytes(data)
            .ok_or_else(|| anyhow!("write() expects a byte string (use encode_utf8() for text)"))?;
        with_channel(|channel| channel.write(&bytes))?;
        Ok(NoneType)
    }

    fn solution_flush() -> anyhow::Result<NoneType> {
        with_channel(|channel| channel.flush())?;
        Ok(NoneType)
    }

    /// Next line from the solution including the newline, "" at end of stream.
    fn solution_readline() -> anyhow::Result<String> {
        with_channel(|channel| channel.read_line())
    }

    fn solution_read() -> anyhow::Result<String> {
        with_channel(|channel| channel.read_to_end())
    }
}

/// Builds the `(output_stream, input_stream)` pair handed to `interact()`
pub(crate) const STREAMS_SNIPPET: &str = "(\
struct(write = solution_write, flush = solution_flush), \
struct(readline = solution_readline, read = solution_read))\n";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_enclosed_path() {
        let base = Path::new("/work");
        assert_eq!(
            enclosed_path(base, "sub/data.txt").unwrap(),
            PathBuf::from("/work/sub/data.txt")
        );
        assert!(enclosed_path(base, "../escape").is_err());
        assert!(enclosed_path(base, "/etc/passwd").is_err());
        assert!(enclosed_path(base, "").is_err());
    }

    #[test]
    fn test_context_is_scoped() {
        let channel = SolutionChannel::new(Vec::new(), Cursor::new(b"42\n".to_vec()));
        let (line, channel) = with_context(Path::new("/work"), Some(channel), || {
            with_channel(|channel| channel.read_line()).unwrap()
        });
        assert_eq!(line, "42\n");
        assert!(channel.is_some());
        assert!(with_work_dir(|dir| Ok(dir.to_path_buf())).is_err());
    }

    #[test]
    fn test_channel_is_byte_exact() {
        let channel = SolutionChannel::new(Vec::new(), Cursor::new(vec![0xff, b'\n', 0x80]));
        let (lines, _) = with_context(Path::new("/work"), Some(channel), || {
            let first = with_channel(|channel| channel.read_line()).unwrap();
            let rest = with_channel(|channel| channel.read_to_end()).unwrap();
            (first, rest)
        });
        assert_eq!(lines.0, "\u{ff}\n");
        assert_eq!(lines.1, "\u{80}");
    }

    #[test]
    fn test_capture_diagnostics() {
        let diagnostics = Diagnostics::capture();
        diagnostics.println("first").unwrap();
        diagnostics.println("second").unwrap();
        diagnostics.println(&bytes_to_text("got ы".as_bytes())).unwrap();
        assert_eq!(diagnostics.take().as_deref(), Some("first\nsecond\ngot ы"));
        assert_eq!(diagnostics.take(), None);
    }
}
