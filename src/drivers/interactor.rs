//! Interactor driver: one live session between the interactor plugin and the
//! process under test.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::read_optional;
use crate::components::Interactor;
use crate::plugin::script::ScriptInteractor;
use crate::plugin::SolutionChannel;

/// Load the interactor and run `interact()` over `channel`.
///
/// A missing `input_data` file reads as empty input.
pub fn run(
    module: &Path,
    work_dir: &Path,
    input_data: Option<&Path>,
    channel: SolutionChannel,
) -> Result<()> {
    let interactor = ScriptInteractor::load(module, work_dir)?;
    let input = match input_data {
        Some(path) => read_optional(path)?,
        None => Vec::new(),
    };
    info!("Starting interaction with {} bytes of input data", input.len());
    interactor.interact(&input, channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const SQUARES_INTERACTOR: &str = r#"
def interact(input_data, output_stream, input_stream):
    values = input_data.split()
    output_stream.write(str(len(values)) + "\n")
    for v in values:
        output_stream.write(v + "\n")
        reply = input_stream.readline().strip()
        if reply != str(int(v) * int(v)):
            fail("wrong square for " + v + ": " + reply)
"#;

    #[test]
    fn test_session_with_input_file() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("interactor.star");
        fs::write(&module, SQUARES_INTERACTOR).unwrap();
        let input = dir.path().join("001.dat");
        fs::write(&input, "5 -3").unwrap();

        let sink = Sink::default();
        let channel = SolutionChannel::new(sink.clone(), Cursor::new(b"25\n9\n".to_vec()));
        run(&module, dir.path(), Some(&input), channel).unwrap();

        assert_eq!(sink.0.borrow().as_slice(), b"2\n5\n-3\n");
    }

    #[test]
    fn test_wrong_reply_fails_session() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("interactor.star");
        fs::write(&module, SQUARES_INTERACTOR).unwrap();
        let input = dir.path().join("001.dat");
        fs::write(&input, "4").unwrap();

        let channel = SolutionChannel::new(Sink::default(), Cursor::new(b"15\n".to_vec()));
        let err = run(&module, dir.path(), Some(&input), channel).unwrap_err();
        assert!(format!("{:#}", err).contains("wrong square for 4"));
    }

    #[test]
    fn test_missing_input_reads_empty() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("interactor.star");
        fs::write(&module, SQUARES_INTERACTOR).unwrap();

        let sink = Sink::default();
        let channel = SolutionChannel::new(sink.clone(), Cursor::new(Vec::new()));
        run(&module, dir.path(), Some(&dir.path().join("absent.dat")), channel).unwrap();
        assert_eq!(sink.0.borrow().as_slice(), b"0\n");
    }

    #[test]
    fn test_echo_keeps_raw_bytes() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("echo.star");
        fs::write(
            &module,
            "def interact(input_data, output_stream, input_stream):\n    output_stream.write(input_data + input_stream.readline())\n",
        )
        .unwrap();
        let input = dir.path().join("001.dat");
        fs::write(&input, [0xc3u8, 0x28]).unwrap();

        let sink = Sink::default();
        let channel = SolutionChannel::new(sink.clone(), Cursor::new(vec![0xff, b'\n']));
        run(&module, dir.path(), Some(&input), channel).unwrap();
        assert_eq!(sink.0.borrow().as_slice(), &[0xc3, 0x28, 0xff, b'\n']);
    }
}
