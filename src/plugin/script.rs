//! Script plugins seen through the capability interfaces

use std::fs;
use std::path::Path;

use anyhow::Context;
use starlark::values::tuple::TupleRef;
use starlark::values::Value;
use tracing::debug;

use super::{convert, stdlib, with_printed, Plugin, PluginError, PluginKind, SolutionChannel};
use crate::components::{
    AnswerProducer, ArgumentsProducer, DirectoryContentProducer, InputProducer, Interactor,
    MatchRequest, OutputMatcher, TestGenerator,
};
use crate::core::{MatchOutcome, TestCase};

/// Function names making up each contract
pub mod capabilities {
    pub const TESTS_COUNT: &str = "get_tests_count";
    pub const DIRECTORY_CONTENT: &str = "generate_directory_content";
    pub const ANSWER: &str = "generate_answer";
    pub const INPUT: &str = "generate_input";
    pub const ARGUMENTS: &str = "generate_arguments";
    pub const MATCH: &str = "match";
    pub const INTERACT: &str = "interact";
}

fn test_number_arg(plugin: &Plugin, test: TestCase) -> anyhow::Result<Value<'_>> {
    let number = i32::try_from(test.number()).context("test number out of range")?;
    Ok(plugin.heap().alloc(number))
}

fn text_arg<'v>(plugin: &'v Plugin, data: &[u8]) -> Value<'v> {
    plugin.heap().alloc(convert::bytes_to_text(data))
}

/// Generator plugin
pub struct ScriptGenerator {
    plugin: Plugin,
}

impl ScriptGenerator {
    pub fn load(path: &Path, work_dir: &Path) -> Result<Self, PluginError> {
        Ok(Self {
            plugin: Plugin::load(PluginKind::Generator, path, work_dir)?,
        })
    }

    fn present(&self, capability: &str) -> bool {
        let present = self.plugin.has_capability(capability);
        if !present {
            debug!("Generator does not define {}(), skipping", capability);
        }
        present
    }
}

impl TestGenerator for ScriptGenerator {
    fn tests_count(&self) -> anyhow::Result<u32> {
        let value = self.plugin.call(capabilities::TESTS_COUNT, &[])?;
        Ok(convert::to_count(capabilities::TESTS_COUNT, value)?)
    }

    fn directory_content_producer(&self) -> Option<&dyn DirectoryContentProducer> {
        self.present(capabilities::DIRECTORY_CONTENT)
            .then_some(self as &dyn DirectoryContentProducer)
    }

    fn answer_producer(&self) -> Option<&dyn AnswerProducer> {
        self.present(capabilities::ANSWER)
            .then_some(self as &dyn AnswerProducer)
    }

    fn input_producer(&self) -> Option<&dyn InputProducer> {
        self.present(capabilities::INPUT)
            .then_some(self as &dyn InputProducer)
    }

    fn arguments_producer(&self) -> Option<&dyn ArgumentsProducer> {
        self.present(capabilities::ARGUMENTS)
            .then_some(self as &dyn ArgumentsProducer)
    }
}

impl DirectoryContentProducer for ScriptGenerator {
    /// The plugin runs with `dir` as its working directory and returns
    /// `{relative_path: content}`; files land under `dir`
    fn directory_content(&self, test: TestCase, dir: &Path) -> anyhow::Result<()> {
        let arg = test_number_arg(&self.plugin, test)?;
        let value = self
            .plugin
            .call_in(capabilities::DIRECTORY_CONTENT, &[arg], dir)?;
        for (name, content) in convert::to_files(capabilities::DIRECTORY_CONTENT, value)? {
            let path = stdlib::enclosed_path(dir, &name)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        }
        Ok(())
    }
}

impl AnswerProducer for ScriptGenerator {
    fn answer(&self, test: TestCase) -> anyhow::Result<Vec<u8>> {
        let arg = test_number_arg(&self.plugin, test)?;
        let value = self.plugin.call(capabilities::ANSWER, &[arg])?;
        Ok(convert::to_bytes(capabilities::ANSWER, value)?)
    }
}

impl InputProducer for ScriptGenerator {
    fn input(&self, test: TestCase) -> anyhow::Result<Vec<u8>> {
        let arg = test_number_arg(&self.plugin, test)?;
        let value = self.plugin.call(capabilities::INPUT, &[arg])?;
        Ok(convert::to_bytes(capabilities::INPUT, value)?)
    }
}

impl ArgumentsProducer for ScriptGenerator {
    fn arguments(&self, test: TestCase) -> anyhow::Result<Vec<String>> {
        let arg = test_number_arg(&self.plugin, test)?;
        let value = self.plugin.call(capabilities::ARGUMENTS, &[arg])?;
        Ok(convert::to_tokens(capabilities::ARGUMENTS, value)?)
    }
}

/// Checker plugin.
///
/// Context-aware requests call `match(tokens, stdin, produced, reference)`,
/// plain ones call `match(observed, standard)`. The result is judged by
/// truthiness; whatever the plugin printed becomes the diagnostic.
pub struct ScriptChecker {
    plugin: Plugin,
}

impl ScriptChecker {
    pub fn load(path: &Path, work_dir: &Path) -> Result<Self, PluginError> {
        Ok(Self {
            plugin: Plugin::load(PluginKind::Checker, path, work_dir)?,
        })
    }
}

impl OutputMatcher for ScriptChecker {
    fn check(&self, request: &MatchRequest<'_>) -> Result<MatchOutcome, PluginError> {
        let plugin = &self.plugin;
        let produced = text_arg(plugin, request.produced);
        let reference = text_arg(plugin, request.reference);
        let args = match request.context {
            Some(context) => vec![
                plugin.heap().alloc(context.tokens.to_vec()),
                text_arg(plugin, context.stdin),
                produced,
                reference,
            ],
            None => vec![produced, reference],
        };

        match plugin.call(capabilities::MATCH, &args) {
            Ok(value) => Ok(MatchOutcome {
                matched: value.to_bool(),
                diagnostic: plugin.take_diagnostics(),
            }),
            Err(PluginError::Execution {
                capability,
                message,
            }) => Err(PluginError::Execution {
                capability,
                message: with_printed(plugin.take_diagnostics(), message),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Interactor plugin: `interact(input_data, output_stream, input_stream)`
pub struct ScriptInteractor {
    plugin: Plugin,
}

impl ScriptInteractor {
    pub fn load(path: &Path, work_dir: &Path) -> Result<Self, PluginError> {
        Ok(Self {
            plugin: Plugin::load(PluginKind::Interactor, path, work_dir)?,
        })
    }

    fn streams(&self) -> Result<(Value<'_>, Value<'_>), PluginError> {
        let pair = self
            .plugin
            .eval_snippet("<interactor streams>", stdlib::STREAMS_SNIPPET)?;
        match TupleRef::from_value(pair).map(|t| t.content()) {
            Some([output, input]) => Ok((*output, *input)),
            _ => Err(PluginError::Instantiate {
                path: self.plugin.path().to_path_buf(),
                message: "cannot build solution streams".to_string(),
            }),
        }
    }
}

impl Interactor for ScriptInteractor {
    fn interact(&self, input_data: &[u8], channel: SolutionChannel) -> anyhow::Result<()> {
        let (output_stream, input_stream) = self.streams()?;
        let input = text_arg(&self.plugin, input_data);
        let (_, channel) = self.plugin.call_with_channel(
            capabilities::INTERACT,
            &[input, output_stream, input_stream],
            Some(channel),
        )?;
        if let Some(mut channel) = channel {
            channel.flush().context("Failed to flush solution stream")?;
        }
        Ok(())
    }
}
