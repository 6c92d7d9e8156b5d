use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use inquire::InquireError;
use strum::{EnumMessage, IntoEnumIterator};
use strum_macros::{EnumIter, EnumMessage, IntoStaticStr};

use crate::config::Settings;
use crate::core::{FEATURE_COUNT, FEATURE_NAMES, LabeledSample, Potability, WaterSample};
use crate::manager::VersionManager;
use crate::serving::Prediction;
use crate::ui::cli::drivers::PromptDriver;
use crate::versioning::{VersionName, VersionView};

const DIM_ITALIC: &str = "\x1b[2m\x1b[3m";
const RESET: &str = "\x1b[0m";

/// Default answer and accepted range for each feature prompt, in column order.
const FEATURE_PROMPTS: [(f64, Option<f64>); FEATURE_COUNT] = [
    (7.0, Some(14.0)),
    (200.0, None),
    (20000.0, None),
    (7.5, None),
    (350.0, None),
    (400.0, None),
    (14.0, None),
    (70.0, None),
    (4.0, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumMessage, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum MenuAction {
    #[strum(message = "List versions", detailed_message = "Every registered model version.")]
    ListVersions,
    #[strum(message = "Show current", detailed_message = "The version serving predictions.")]
    ShowCurrent,
    #[strum(message = "Predict", detailed_message = "Classify one water sample.")]
    Predict,
    #[strum(
        message = "Predict file",
        detailed_message = "Classify every row of a CSV and write the results."
    )]
    PredictFile,
    #[strum(
        message = "Retrain",
        detailed_message = "Add a labeled sample and train a new version."
    )]
    Retrain,
    #[strum(message = "Switch version", detailed_message = "Serve another version.")]
    SwitchVersion,
    #[strum(message = "Delete version", detailed_message = "Remove a version and its files.")]
    DeleteVersion,
    #[strum(
        message = "Evaluate",
        detailed_message = "Metrics and cross-validation on a labeled CSV."
    )]
    Evaluate,
    #[strum(
        message = "Train base model",
        detailed_message = "Refit the Original version on the base dataset."
    )]
    TrainBase,
    #[strum(message = "Config schema", detailed_message = "Print the settings JSON schema.")]
    ExportSchema,
    #[strum(message = "Quit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn item_text<K>(kind: K) -> String
where
    K: Copy + Into<&'static str> + EnumMessage,
{
    let label = kind.get_message().unwrap_or_else(|| kind.into());
    match kind.get_detailed_message() {
        Some(desc) if !desc.is_empty() && desc != label => {
            format!("{label}  {DIM_ITALIC}{desc}{RESET}")
        }
        _ => label.to_string(),
    }
}

pub fn choose_action<D: PromptDriver>(driver: &D) -> Result<MenuAction> {
    let actions: Vec<MenuAction> = MenuAction::iter().collect();
    let labels: Vec<String> = actions.iter().map(|a| item_text(*a)).collect();
    let idx = driver.ask_choice("What next?", "", &labels)?;
    actions
        .get(idx)
        .copied()
        .with_context(|| format!("no menu entry at index {idx}"))
}

/// Runs the menu until the user quits. Failed actions are reported and the loop continues;
/// Esc returns to the menu and Ctrl-C leaves it.
pub fn run<D: PromptDriver>(driver: &D, manager: &VersionManager) -> Result<()> {
    let mut out = std::io::stdout().lock();
    loop {
        let step = choose_action(driver).and_then(|a| execute(a, driver, manager, &mut out));
        match step {
            Ok(Flow::Quit) => return Ok(()),
            Ok(Flow::Continue) => {}
            Err(e) => match e.downcast_ref::<InquireError>() {
                Some(InquireError::OperationInterrupted) => return Ok(()),
                Some(InquireError::OperationCanceled) => {}
                _ => eprintln!("✗ {e:#}"),
            },
        }
    }
}

pub fn execute<D: PromptDriver, W: Write>(
    action: MenuAction,
    driver: &D,
    manager: &VersionManager,
    out: &mut W,
) -> Result<Flow> {
    match action {
        MenuAction::ListVersions => {
            for view in manager.list() {
                writeln!(out, "{}", version_line(&view))?;
            }
        }
        MenuAction::ShowCurrent => {
            let current = manager.current();
            let line = manager
                .list()
                .into_iter()
                .find(|v| v.version == current)
                .map(|v| version_line(&v))
                .unwrap_or_else(|| current.to_string());
            writeln!(out, "{line}")?;
        }
        MenuAction::Predict => {
            let sample = prompt_sample(driver)?;
            let version = prompt_optional_version(driver)?;
            let p = manager.predict(&sample, version.as_ref())?;
            writeln!(out, "{}", prediction_line(&p))?;
        }
        MenuAction::PredictFile => {
            let input = prompt_path(driver, "Input CSV", "Features-only table", "", true)?;
            let output = driver.ask_string("Output CSV", "", "predictions.csv")?;
            let samples = crate::core::read_samples_csv(&input)?;
            let predictions = manager.predict_batch(&samples, None)?;
            write_predictions(Path::new(output.trim()), &samples, &predictions)?;
            writeln!(out, "Wrote {} predictions to {}", predictions.len(), output.trim())?;
        }
        MenuAction::Retrain => {
            let sample = prompt_sample(driver)?;
            let label = driver.ask_u64(
                "Potability",
                "0 = not potable, 1 = potable",
                1,
                Some(0),
                Some(1),
            )?;
            let label = Potability::try_from(label as i64)?;
            let result = manager.retrain_and_reload(&LabeledSample::new(sample, label))?;
            writeln!(out, "{}", result.message)?;
            writeln!(
                out,
                "accuracy {:.4}  cv accuracy {:.4}  ({} accumulated sample(s))",
                result.accuracy, result.cv_accuracy, result.incremental_samples
            )?;
        }
        MenuAction::SwitchVersion => {
            let name = prompt_version(driver, "Switch to")?;
            manager.switch_and_reload(&name)?;
            writeln!(out, "Now serving {name}")?;
        }
        MenuAction::DeleteVersion => {
            let name = prompt_version(driver, "Delete")?;
            if driver.ask_bool(&format!("Delete {name} and its files?"), "", false)? {
                manager.delete(&name)?;
                writeln!(out, "Deleted {name}")?;
            }
        }
        MenuAction::Evaluate => {
            let default = manager.settings().base_dataset.to_string_lossy().into_owned();
            let path = prompt_path(
                driver,
                "Labeled CSV",
                "Table with a Potability column",
                &default,
                true,
            )?;
            let version = prompt_optional_version(driver)?;
            let report = manager.evaluate(version.as_ref(), &path)?;
            writeln!(out, "{report}")?;
        }
        MenuAction::TrainBase => {
            let base = manager.settings().base_dataset.display().to_string();
            if driver.ask_bool(&format!("Refit Original on {base}?"), "", false)? {
                let result = manager.train_base()?;
                writeln!(out, "{}", result.message)?;
            }
        }
        MenuAction::ExportSchema => {
            let schema = serde_json::to_string_pretty(&Settings::json_schema())?;
            writeln!(out, "{schema}")?;
        }
        MenuAction::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn version_line(v: &VersionView) -> String {
    let marker = if v.is_current { "*" } else { " " };
    format!(
        "{marker} {:<9} {}  samples={:<6} acc={:.4} cv={:.4}  {}",
        v.version.to_string(),
        v.created_at.format("%Y-%m-%d %H:%M:%S"),
        v.training_samples,
        v.accuracy,
        v.cv_accuracy,
        v.description
    )
}

fn prediction_line(p: &Prediction) -> String {
    format!(
        "{} (confidence {:.1}%) using {}",
        p.label(),
        p.confidence * 100.0,
        p.version
    )
}

fn prompt_sample<D: PromptDriver>(driver: &D) -> Result<WaterSample> {
    let mut values = [0.0; FEATURE_COUNT];
    for ((slot, name), (default, max)) in values.iter_mut().zip(FEATURE_NAMES).zip(FEATURE_PROMPTS) {
        *slot = driver.ask_f64(name, "", default, Some(0.0), max)?;
    }
    let sample = WaterSample::from_array(values);
    sample.validate()?;
    Ok(sample)
}

fn prompt_version<D: PromptDriver>(driver: &D, title: &str) -> Result<VersionName> {
    let answer = driver.ask_string(title, "Original or V<n>", "")?;
    let answer = answer.trim();
    if answer.is_empty() {
        bail!("no version given");
    }
    Ok(VersionName::from(answer))
}

fn prompt_optional_version<D: PromptDriver>(driver: &D) -> Result<Option<VersionName>> {
    let answer = driver.ask_string("Version", "Leave blank for the current version", "")?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| VersionName::from(answer)))
}

fn validate_csv_path(input: &str, must_exist: bool) -> Result<(), String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Path cannot be empty".into());
    }
    let p = Path::new(trimmed);
    if must_exist && !p.is_file() {
        return Err(format!("Not a file: {}", p.display()));
    }
    match p.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(()),
        _ => Err("Expected a .csv file".into()),
    }
}

fn prompt_path<D: PromptDriver>(
    driver: &D,
    title: &str,
    help: &str,
    default: &str,
    must_exist: bool,
) -> Result<PathBuf> {
    loop {
        let answer = driver.ask_string(title, help, default)?;
        match validate_csv_path(&answer, must_exist) {
            Ok(()) => return Ok(PathBuf::from(answer.trim())),
            Err(msg) => eprintln!("✗ {msg}"),
        }
    }
}

fn write_predictions(path: &Path, samples: &[WaterSample], predictions: &[Prediction]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{},Prediction,Label,Confidence,Version", FEATURE_NAMES.join(","))?;
    for (s, p) in samples.iter().zip(predictions) {
        let cells: Vec<String> = s.to_array().iter().map(f64::to_string).collect();
        writeln!(
            w,
            "{},{},{},{:.6},{}",
            cells.join(","),
            p.potability.class_index(),
            p.label(),
            p.confidence,
            p.version
        )?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Workspace;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug)]
    enum Answer {
        Bool(bool),
        Text(String),
        Int(u64),
        Default,
        Choice(usize),
    }

    /// Replays answers in order; `Default` accepts the prompt's default.
    struct ScriptedDriver {
        answers: RefCell<VecDeque<Answer>>,
    }

    impl ScriptedDriver {
        fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: RefCell::new(answers.into()),
            }
        }

        fn next(&self, title: &str) -> Result<Answer> {
            self.answers
                .borrow_mut()
                .pop_front()
                .with_context(|| format!("script exhausted at `{title}`"))
        }
    }

    impl PromptDriver for ScriptedDriver {
        fn ask_bool(&self, title: &str, _: &str, default: bool) -> Result<bool> {
            match self.next(title)? {
                Answer::Bool(b) => Ok(b),
                Answer::Default => Ok(default),
                other => bail!("`{title}` expected a bool, script had {other:?}"),
            }
        }

        fn ask_string(&self, title: &str, _: &str, default: &str) -> Result<String> {
            match self.next(title)? {
                Answer::Text(s) => Ok(s),
                Answer::Default => Ok(default.to_string()),
                other => bail!("`{title}` expected text, script had {other:?}"),
            }
        }

        fn ask_u64(
            &self,
            title: &str,
            _: &str,
            default: u64,
            _: Option<u64>,
            _: Option<u64>,
        ) -> Result<u64> {
            match self.next(title)? {
                Answer::Int(n) => Ok(n),
                Answer::Default => Ok(default),
                other => bail!("`{title}` expected an integer, script had {other:?}"),
            }
        }

        fn ask_f64(
            &self,
            title: &str,
            _: &str,
            default: f64,
            _: Option<f64>,
            _: Option<f64>,
        ) -> Result<f64> {
            match self.next(title)? {
                Answer::Default => Ok(default),
                other => bail!("`{title}` expected a number, script had {other:?}"),
            }
        }

        fn ask_choice(&self, title: &str, _: &str, options: &[String]) -> Result<usize> {
            match self.next(title)? {
                Answer::Choice(i) if i < options.len() => Ok(i),
                other => bail!("`{title}` expected a choice, script had {other:?}"),
            }
        }
    }

    fn default_sample() -> Vec<Answer> {
        (0..FEATURE_COUNT).map(|_| Answer::Default).collect()
    }

    fn run_action(action: MenuAction, driver: &ScriptedDriver, m: &VersionManager) -> String {
        let mut out = Vec::new();
        let flow = execute(action, driver, m, &mut out).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(driver.answers.borrow().is_empty(), "unused answers");
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn menu_lists_every_action_in_order() {
        let driver = ScriptedDriver::new(vec![Answer::Choice(0)]);
        assert_eq!(choose_action(&driver).unwrap(), MenuAction::ListVersions);
        let last = MenuAction::iter().count() - 1;
        let driver = ScriptedDriver::new(vec![Answer::Choice(last)]);
        assert_eq!(choose_action(&driver).unwrap(), MenuAction::Quit);
        assert!(item_text(MenuAction::Retrain).starts_with("Retrain"));
        assert_eq!(item_text(MenuAction::Quit), "Quit");
    }

    #[test]
    fn quit_stops_the_loop() {
        let ws = Workspace::new(20);
        let m = VersionManager::open(ws.settings.clone()).unwrap();
        let driver = ScriptedDriver::new(vec![]);
        let mut out = Vec::new();
        assert_eq!(execute(MenuAction::Quit, &driver, &m, &mut out).unwrap(), Flow::Quit);
    }

    #[test]
    fn predict_and_retrain_flows() {
        let ws = Workspace::new(40);
        let m = VersionManager::open(ws.settings.clone()).unwrap();

        let mut answers = default_sample();
        answers.push(Answer::Text("".into()));
        let text = run_action(MenuAction::Predict, &ScriptedDriver::new(answers), &m);
        assert!(text.contains("using Original"), "{text}");

        let mut answers = default_sample();
        answers.push(Answer::Int(1));
        let text = run_action(MenuAction::Retrain, &ScriptedDriver::new(answers), &m);
        assert!(text.starts_with("Model V1 trained successfully with 41 samples"), "{text}");

        let text = run_action(MenuAction::ListVersions, &ScriptedDriver::new(vec![]), &m);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  Original"));
        assert!(lines[1].starts_with("* V1"));
    }

    #[test]
    fn switch_then_delete_flow() {
        let ws = Workspace::new(30);
        let m = VersionManager::open(ws.settings.clone()).unwrap();
        let mut answers = default_sample();
        answers.push(Answer::Int(0));
        run_action(MenuAction::Retrain, &ScriptedDriver::new(answers), &m);

        let text = run_action(
            MenuAction::SwitchVersion,
            &ScriptedDriver::new(vec![Answer::Text("Original".into())]),
            &m,
        );
        assert_eq!(text.trim(), "Now serving Original");

        let declined = ScriptedDriver::new(vec![Answer::Text("V1".into()), Answer::Default]);
        assert_eq!(run_action(MenuAction::DeleteVersion, &declined, &m), "");
        assert!(m.get(&VersionName::Numbered(1)).is_some());

        let confirmed = ScriptedDriver::new(vec![Answer::Text("V1".into()), Answer::Bool(true)]);
        assert_eq!(run_action(MenuAction::DeleteVersion, &confirmed, &m).trim(), "Deleted V1");
        assert!(m.get(&VersionName::Numbered(1)).is_none());
    }

    #[test]
    fn deleting_original_surfaces_an_error() {
        let ws = Workspace::new(20);
        let m = VersionManager::open(ws.settings.clone()).unwrap();
        let driver = ScriptedDriver::new(vec![Answer::Text("Original".into()), Answer::Bool(true)]);
        let err = execute(MenuAction::DeleteVersion, &driver, &m, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("permanent"), "{err}");
    }

    #[test]
    fn predict_file_writes_one_row_per_sample() {
        let ws = Workspace::new(30);
        let m = VersionManager::open(ws.settings.clone()).unwrap();
        let input = ws.path("input.csv");
        std::fs::write(
            &input,
            format!(
                "{}\n7,200,20000,7.5,350,400,14,70,4\n5,180,15000,6,450,420,12,60,3\n",
                FEATURE_NAMES.join(",")
            ),
        )
        .unwrap();
        let output = ws.path("out.csv");
        let driver = ScriptedDriver::new(vec![
            Answer::Text(input.to_string_lossy().into_owned()),
            Answer::Text(output.to_string_lossy().into_owned()),
        ]);
        let text = run_action(MenuAction::PredictFile, &driver, &m);
        assert!(text.starts_with("Wrote 2 predictions"), "{text}");

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Prediction,Label,Confidence,Version"));
        assert!(lines[1].ends_with(",Original"));
    }

    #[test]
    fn schema_export_is_json() {
        let ws = Workspace::new(20);
        let m = VersionManager::open(ws.settings.clone()).unwrap();
        let text = run_action(MenuAction::ExportSchema, &ScriptedDriver::new(vec![]), &m);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(v.get("properties").is_some());
    }

    #[test]
    fn csv_paths_are_checked() {
        assert!(validate_csv_path("", false).is_err());
        assert!(validate_csv_path("out.txt", false).is_err());
        assert!(validate_csv_path("out.CSV", false).is_ok());
        assert!(validate_csv_path("/definitely/missing.csv", true).is_err());
    }
}
