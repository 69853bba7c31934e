use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use elai_assist::{Answer, Assistant, Conversation};
use elai_core::config::Settings;
use elai_core::traits::Generator;
use elai_core::types::{Location, RetrievedContext};
use elai_core::Error;
use elai_corpus::{CachedCorpus, CorpusLoader};
use elai_history::{HistoryLog, HistoryStore};

#[derive(Debug, Clone, PartialEq)]
struct Call {
    instructions: String,
    manual: Vec<String>,
    history: Vec<String>,
    query: String,
}

#[derive(Clone, Default)]
struct ScriptedGenerator {
    calls: Arc<Mutex<Vec<Call>>>,
    fail: bool,
}

impl Generator for ScriptedGenerator {
    fn generate(&self, system_instructions: &str, context: &RetrievedContext<'_>, query: &str) -> anyhow::Result<String> {
        self.calls.lock().expect("lock").push(Call {
            instructions: system_instructions.to_string(),
            manual: context.manual.iter().map(|m| m.item.text().to_string()).collect(),
            history: context.history.iter().map(|m| m.item.error_code.clone()).collect(),
            query: query.to_string(),
        });
        if self.fail { anyhow::bail!("upstream returned 503"); }
        Ok(format!("Check the door sensor ({} sources)", context.manual.len()))
    }
}

const DOOR: &str = "도어 열림 센서 이상 시 E31 코드 발생. 도어 스위치 배선과 센서 전원 커넥터를 순서대로 점검한다.";
const BRAKE: &str = "브레이크 코일 전압이 정격 이하로 떨어지면 E12 코드가 발생하며 브레이크가 해제되지 않는다.";
const HISTORY: &str = "고장증상,에러코드,처리내용\n도어 열림 센서 이상,E31,도어 센서 교체\n브레이크 소음,E12,라이닝 조정\n";

fn workspace() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    fs::create_dir(tmp.path().join("manuals")).expect("mkdir");
    fs::write(tmp.path().join("manuals").join("door.txt"), DOOR).expect("write");
    fs::write(tmp.path().join("manuals").join("brake.md"), BRAKE).expect("write");
    fs::write(tmp.path().join("failure_history.csv"), HISTORY).expect("write");
    tmp
}

fn assistant(dir: &Path, generator: ScriptedGenerator) -> Assistant<ScriptedGenerator> {
    let manuals = CachedCorpus::new(CorpusLoader::default(), dir.join("manuals"));
    let history = HistoryStore::open(dir.join("failure_history.csv")).expect("history");
    Assistant::new(manuals, history, generator)
}

#[test]
fn answers_with_manual_and_history_context() {
    let tmp = workspace();
    let generator = ScriptedGenerator::default();
    let assistant = assistant(tmp.path(), generator.clone()).with_instructions("be brief");
    let mut conversation = Conversation::new();

    let answer = assistant.ask("도어 열림 센서 E31", &mut conversation).expect("ask");
    let Answer::Generated { text, sources, related_failures } = answer else { panic!("expected an answer") };
    assert_eq!(text, "Check the door sensor (1 sources)");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].source_id, "door.txt");
    assert_eq!(sources[0].location, Location::NotApplicable);
    assert_eq!(related_failures.len(), 1);
    assert_eq!(related_failures[0].error_code, "E31");

    let calls = generator.calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].instructions, "be brief");
    assert_eq!(calls[0].manual, vec![DOOR.to_string()]);
    assert_eq!(calls[0].history, vec!["E31".to_string()]);
    assert_eq!(calls[0].query, "도어 열림 센서 E31");

    assert_eq!(conversation.turns().len(), 1);
    assert_eq!(conversation.last().map(|t| t.question.as_str()), Some("도어 열림 센서 E31"));
}

#[test]
fn no_context_skips_the_generator() {
    let tmp = workspace();
    let generator = ScriptedGenerator::default();
    let assistant = assistant(tmp.path(), generator.clone());
    let mut conversation = Conversation::new();

    let answer = assistant.ask("xyzzy plugh", &mut conversation).expect("ask");
    assert_eq!(answer, Answer::NoContext);
    assert!(generator.calls.lock().expect("lock").is_empty());
    assert_eq!(conversation.turns().len(), 1, "unanswered turns are still recorded");
}

#[test]
fn generator_failure_is_distinguishable() {
    let tmp = workspace();
    let generator = ScriptedGenerator { fail: true, ..ScriptedGenerator::default() };
    let assistant = assistant(tmp.path(), generator);
    let mut conversation = Conversation::new();

    let err = assistant.ask("E12 브레이크", &mut conversation).expect_err("generation fails");
    assert!(matches!(err, Error::Generation(ref m) if m.contains("503")));
    assert!(conversation.is_empty());
}

#[test]
fn history_threshold_is_stricter_than_manual_threshold() {
    let tmp = workspace();
    let generator = ScriptedGenerator::default();
    let assistant = assistant(tmp.path(), generator.clone());
    let corpus = assistant.manuals().get();

    // one shared token out of many: positive for manuals, below 0.2 for history
    let question = "도어 가 나 다 라 마 바 사 아 자 차 카 타 파 하";
    let ctx = assistant.context(question, &corpus);
    assert_eq!(ctx.manual.len(), 1);
    assert!(ctx.history.is_empty());
}

#[test]
fn interactions_are_logged_when_enabled() {
    let tmp = workspace();
    let log_path = tmp.path().join("failure_history.csv");
    let assistant = assistant(tmp.path(), ScriptedGenerator::default()).with_log(HistoryLog::new(&log_path));
    let mut conversation = Conversation::new();

    assistant.ask("브레이크 E12", &mut conversation).expect("ask");
    assistant.ask("xyzzy", &mut conversation).expect("ask");

    let reread = HistoryStore::open(&log_path).expect("reopen");
    assert_eq!(reread.records().len(), 3, "only the generated answer is logged");
    let logged = &reread.records()[2];
    assert_eq!(logged.symptom, "브레이크 E12");
    assert_eq!(logged.resolution, "Check the door sensor (1 sources)");
}

#[test]
fn manuals_reload_after_change() {
    let tmp = workspace();
    let assistant = assistant(tmp.path(), ScriptedGenerator::default());
    let mut conversation = Conversation::new();
    assert_eq!(assistant.ask("governor rope tension", &mut conversation).expect("ask"), Answer::NoContext);

    fs::write(
        tmp.path().join("manuals").join("governor.txt"),
        "Governor rope tension must be checked monthly with the tension gauge.",
    )
    .expect("write");
    assert!(matches!(assistant.ask("governor rope tension", &mut conversation).expect("ask"), Answer::Generated { .. }));
}

#[test]
fn from_settings_resolves_paths_and_enables_logging() {
    let tmp = workspace();
    let mut settings = Settings::default();
    settings.history.log_interactions = true;
    settings.retrieval.manual_top_k = 1;

    let assistant = Assistant::from_settings(&settings, tmp.path(), ScriptedGenerator::default()).expect("assistant");
    assert_eq!(assistant.manuals().dir(), tmp.path().join("manuals"));
    assert_eq!(assistant.history().records().len(), 2);

    let mut conversation = Conversation::new();
    let answer = assistant.ask("E31 E12 코드", &mut conversation).expect("ask");
    let Answer::Generated { sources, .. } = answer else { panic!("expected an answer") };
    assert_eq!(sources.len(), 1, "manual_top_k applied");
    assert_eq!(HistoryStore::open(tmp.path().join("failure_history.csv")).expect("reopen").records().len(), 3);
}

#[test]
fn log_failure_keeps_the_answer() {
    let tmp = workspace();
    let unwritable = tmp.path().join("log_is_a_dir");
    fs::create_dir(&unwritable).expect("mkdir");
    let assistant = assistant(tmp.path(), ScriptedGenerator::default()).with_log(HistoryLog::new(&unwritable));
    let mut conversation = Conversation::new();

    let answer = assistant.ask("브레이크 E12", &mut conversation).expect("answer survives the log failure");
    assert!(matches!(answer, Answer::Generated { ref text, .. } if text == "Check the door sensor (1 sources)"));
    assert_eq!(conversation.turns().len(), 1);
    assert_eq!(conversation.last().map(|t| &t.answer), Some(&answer));
}
