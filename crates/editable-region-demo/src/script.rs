use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use editable_region_config::Config;
use editable_region_engine::{
    BridgeHooks, HostSupport, InputIntent, InputKind, PlainText, SimulatedHost, StaticRange, SurfaceOptions,
};
use serde::Deserialize;

/// A recorded sequence of host input
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Script {
    pub initial_text: String,
    pub steps: Vec<Step>,
}

/// Offsets are UTF-16 positions in the region's text
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    BeforeInput {
        input_type: InputKind,
        #[serde(default)]
        data: Option<String>,
        #[serde(default = "cancelable_by_default")]
        cancelable: bool,
        /// Target range; the selection is used when absent
        #[serde(default)]
        start: Option<usize>,
        #[serde(default)]
        end: Option<usize>,
    },
    Compose {
        updates: Vec<String>,
        committed: String,
    },
    Select {
        start: usize,
        end: usize,
    },
}

fn cancelable_by_default() -> bool {
    true
}

/// What a replay produced
#[derive(Debug, Default)]
pub struct Transcript {
    pub calls: Vec<String>,
    pub selections: Vec<String>,
    pub text: String,
    pub caret: Option<String>,
    pub html: String,
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "calls:")?;
        for call in &self.calls {
            writeln!(f, "  {call}")?;
        }
        writeln!(f, "selection reports:")?;
        for selection in &self.selections {
            writeln!(f, "  {selection}")?;
        }
        writeln!(f, "text: {:?}", self.text)?;
        writeln!(f, "caret: {}", self.caret.as_deref().unwrap_or("none"))?;
        write!(f, "html: {}", self.html)
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse script {}", path.display()))
    }

    pub fn run(&self, config: &Config) -> Result<Transcript> {
        let options = SurfaceOptions {
            tag: config.surface.tag.clone(),
            attributes: config.surface.attributes.clone(),
        };
        let mut support = match &config.host.user_agent {
            Some(user_agent) => HostSupport::from_user_agent(user_agent),
            None => HostSupport::assume_supported(),
        };
        if let Some(forced) = config.host.force_support {
            support = support.with_override(Some(forced));
        }

        let selections = Rc::new(RefCell::new(Vec::new()));
        let sink = selections.clone();
        let mut hooks = BridgeHooks::new(move |range| {
            let report = range.map_or_else(|| "outside".to_string(), ToString::to_string);
            sink.borrow_mut().push(report);
        });
        if config.selection.report_overlap {
            let sink = selections.clone();
            hooks = hooks.on_partial_overlap(move |_| sink.borrow_mut().push("overlap".to_string()));
        }

        let mut host = SimulatedHost::mount(
            &options,
            &support,
            PlainText::new(&self.initial_text),
            PlainText::markup,
        )
        .context("Failed to mount the editable region")?
        .with_bridge(hooks);

        for (index, step) in self.steps.iter().enumerate() {
            log::info!("step {}: {step:?}", index + 1);
            Self::apply(&mut host, step).with_context(|| format!("Step {} failed", index + 1))?;
        }

        let caret = host.selected_range()?.map(|range| range.to_string());
        let calls = host.handler().calls().iter().map(ToString::to_string).collect();
        let selections = selections.borrow().clone();
        Ok(Transcript {
            calls,
            selections,
            text: host.handler().text(),
            caret,
            html: host.doc().outer_html(host.root()),
        })
    }

    fn apply(host: &mut SimulatedHost<PlainText>, step: &Step) -> Result<()> {
        match step {
            Step::BeforeInput {
                input_type,
                data,
                cancelable,
                start,
                end,
            } => {
                let mut intent = InputIntent::new(input_type.clone()).cancelable(*cancelable);
                if let Some(data) = data {
                    intent = intent.with_data(data.clone());
                }
                if let Some(start) = start {
                    let node = host.text_node().unwrap_or(host.root());
                    let end = end.unwrap_or(*start);
                    intent = intent.with_target(StaticRange::new(node, *start, node, end));
                }
                let dispatch = host.before_input(intent)?;
                log::debug!("default prevented: {}", dispatch.default_prevented);
            }
            Step::Compose { updates, committed } => {
                let updates: Vec<&str> = updates.iter().map(String::as_str).collect();
                host.compose(&updates, committed)?;
            }
            Step::Select { start, end } => host.select_text(*start, *end)?,
        }
        Ok(())
    }
}
