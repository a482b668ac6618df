mod common;

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use common::{RecordingSink, Script, ScriptedFrontend, Word, config, mapping, session, trial};
use rand::SeedableRng;
use rand::rngs::StdRng;
use stroop_core::{Phase, TrialKind};
use stroop_experiment::{
    CsvSink, ExperimentConfig, InfoScreen, Session, SessionEnd, SessionError, TrialPlan,
    TrialScheduler, run_blocks,
};
use stroop_timing::ManualTimer;

fn plan() -> TrialPlan<Word> {
    TrialPlan {
        training: vec![vec![trial(TrialKind::Congruent, "RED", "red")]],
        experiment: vec![
            trial(TrialKind::Congruent, "GREEN", "green"),
            trial(TrialKind::Incongruent, "BLUE", "red"),
            trial(TrialKind::Neutral, "XXXX", "yellow"),
            trial(TrialKind::Incongruent, "RED", "blue"),
        ],
        mapping: mapping(),
    }
}

fn two_blocks() -> ExperimentConfig {
    ExperimentConfig {
        number_of_blocks: 2,
        ..config()
    }
}

fn scheduler(timer: &ManualTimer) -> TrialScheduler<ManualTimer, StdRng> {
    TrialScheduler::new(&mapping(), timer.clone(), StdRng::seed_from_u64(11))
}

fn press(ms: u64, key: char) -> Script {
    Script::Press {
        after: Duration::from_millis(ms),
        key,
    }
}

#[test]
fn full_session_runs_blocks_in_order_and_exports_once() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();
    let mut sched = scheduler(&timer);
    let mut frontend = ScriptedFrontend::new(
        &timer,
        vec![
            press(500, 'z'),
            press(400, 'x'),
            Script::Silent,
            press(650, 'm'),
            press(300, 'z'),
        ],
    );
    let plan = plan();

    {
        let mut session = Session::new(session(two_blocks(), &timer), sink);
        let end = session
            .run(|state| run_blocks(state, &mut sched, &plan, &mut frontend))
            .unwrap();
        assert_eq!(end, SessionEnd::Completed);
        assert!(session.finalizer().is_finalized());
        let suffix = session.finalizer().suffix().unwrap();
        assert!((100..=999).contains(&suffix));
    }

    assert_eq!(
        frontend.info_screens,
        vec![
            InfoScreen::Training(1),
            InfoScreen::Instruction,
            InfoScreen::Break(1),
            InfoScreen::End,
        ]
    );

    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);

    let phases: Vec<Phase> = recorded.rows.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::Training,
            Phase::Experiment,
            Phase::Experiment,
            Phase::Experiment,
            Phase::Experiment,
        ]
    );
    let texts: Vec<&str> = recorded.rows.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["RED", "GREEN", "BLUE", "XXXX", "RED"]);
    let correct: Vec<bool> = recorded.rows.iter().map(|r| r.correct).collect();
    assert_eq!(correct, vec![true, true, false, true, false]);

    // Training emits nothing; experiment trials: answered, silent, answered, answered.
    let indices: Vec<u64> = recorded.events.iter().map(|e| e.index()).collect();
    assert_eq!(indices, (0..7).collect::<Vec<u64>>());
}

#[test]
fn abort_mid_poll_exports_partial_session_once() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();
    let mut sched = scheduler(&timer);
    let mut frontend = ScriptedFrontend::new(
        &timer,
        vec![
            press(500, 'z'),
            press(400, 'x'),
            Script::AbortAfter(Duration::from_millis(200)),
        ],
    );
    let plan = plan();

    {
        let mut session = Session::new(session(two_blocks(), &timer), sink);
        let end = session
            .run(|state| run_blocks(state, &mut sched, &plan, &mut frontend))
            .unwrap();
        assert_eq!(end, SessionEnd::Aborted);
        // Explicit second call is a no-op.
        session.finalize().unwrap();
    }

    assert!(sched.abort.is_raised());
    assert!(!frontend.info_screens.contains(&InfoScreen::End));

    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);
    assert_eq!(recorded.rows.len(), 2);
    // Stimulus + answer for the first experiment trial, then the interrupted onset.
    assert_eq!(recorded.events.len(), 3);
    assert!(recorded.events[2].metadata().is_empty());
}

#[test]
fn abort_on_an_info_screen_ends_the_session() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();
    let mut sched = scheduler(&timer);
    let mut frontend = ScriptedFrontend::new(&timer, vec![press(500, 'z')]);
    frontend.abort_on_info = Some(InfoScreen::Instruction);
    let plan = plan();

    let mut session = Session::new(session(two_blocks(), &timer), sink);
    let end = session
        .run(|state| run_blocks(state, &mut sched, &plan, &mut frontend))
        .unwrap();
    drop(session);

    assert_eq!(end, SessionEnd::Aborted);
    assert_eq!(
        frontend.info_screens,
        vec![InfoScreen::Training(1), InfoScreen::Instruction]
    );
    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.rows.len(), 1);
    assert!(recorded.events.is_empty());
}

#[test]
fn fatal_error_is_returned_after_exporting() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();

    let mut session = Session::new(session(config(), &timer), sink);
    let err = session
        .run(|_| Err(SessionError::Frontend(io::Error::other("display lost"))))
        .unwrap_err();
    drop(session);

    assert!(matches!(err, SessionError::Frontend(_)));
    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);
}

#[test]
fn panic_inside_the_session_still_exports_once() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut session = Session::new(session(config(), &timer), sink);
        session.run(|_| panic!("renderer crashed"))
    }));

    assert!(outcome.is_err());
    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);
}

#[test]
fn dropping_an_unrun_session_exports_empty_outputs() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();

    drop(Session::new(session(config(), &timer), sink));

    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert!(recorded.rows.is_empty());
}

#[test]
fn csv_sink_writes_both_files_with_a_shared_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");
    let timer = ManualTimer::new();
    let mut sched = scheduler(&timer);
    let mut frontend = ScriptedFrontend::new(&timer, vec![press(450, 'z')]);

    let mut session = Session::new(session(config(), &timer), CsvSink::new(&out));
    let red = trial(TrialKind::Congruent, "RED", "red");
    let end = session
        .run(|state| sched.run_trial(state, Phase::Experiment, &red, &mut frontend))
        .unwrap();
    assert_eq!(end, SessionEnd::Completed);

    let suffix = session.finalizer().suffix().unwrap();
    let sink = session.finalizer().sink();
    let beh = std::fs::read_to_string(sink.results_path("P1MALE20", suffix)).unwrap();
    let map = std::fs::read_to_string(sink.trigger_map_path("P1MALE20", suffix)).unwrap();

    let beh: Vec<&str> = beh.lines().collect();
    assert_eq!(
        beh,
        vec![
            concat!(
                "phase,trial_type,text,color,wait_time,response_deadline,",
                "reaction_time,expected_key,observed_key,correct"
            ),
            "experiment,congruent,RED,red,1.0,2.0,0.45,z,z,true",
        ]
    );

    let map: Vec<&str> = map.lines().collect();
    assert_eq!(map[0], "index,trigger_type,code,timestamp,acc,stimulus");
    assert_eq!(map.len(), 3);
    assert!(map[1].starts_with("0,stimulus,1,"));
    assert!(map[1].ends_with(",,"));
    assert!(map[2].starts_with("1,answer,2,"));
    assert!(map[2].ends_with(",true,congruent"));
}

#[test]
fn earlier_outputs_are_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(dir.path());
    for suffix in 100..=999 {
        std::fs::write(sink.results_path("P1MALE20", suffix), "PREVIOUS RUN\n").unwrap();
    }
    let timer = ManualTimer::new();

    let mut session = Session::new(session(config(), &timer), sink);
    session.finalize().unwrap();

    let suffix = session.finalizer().suffix().unwrap();
    assert_eq!(suffix, 1000);
    let sink = session.finalizer().sink();
    for old in [100, 512, 999] {
        let text = std::fs::read_to_string(sink.results_path("P1MALE20", old)).unwrap();
        assert_eq!(text, "PREVIOUS RUN\n");
    }
    let beh = std::fs::read_to_string(sink.results_path("P1MALE20", suffix)).unwrap();
    assert!(beh.starts_with("phase,trial_type"));
    assert!(sink.trigger_map_path("P1MALE20", suffix).exists());
}

#[test]
fn invalid_config_exports_before_failing_to_start() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();
    let invalid = ExperimentConfig {
        number_of_blocks: 0,
        ..config()
    };

    let err = Session::start("P1MALE20", invalid, timer, sink).err().unwrap();

    assert!(matches!(err, SessionError::Configuration(_)));
    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);
    assert!(recorded.rows.is_empty());
}

#[test]
fn unreachable_trigger_port_exports_before_failing_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();
    let eeg = ExperimentConfig {
        use_eeg: true,
        trigger_port: Some(dir.path().join("missing")),
        ..config()
    };

    let err = Session::start("P1MALE20", eeg, timer, sink).err().unwrap();

    assert!(matches!(err, SessionError::Connection(_)));
    let recorded = recorded.borrow();
    assert_eq!(recorded.results_calls, 1);
    assert_eq!(recorded.trigger_calls, 1);
}

#[test]
fn valid_config_starts_without_exporting() {
    let timer = ManualTimer::new();
    let sink = RecordingSink::default();
    let recorded = sink.recorded.clone();

    let session = Session::start("P1MALE20", config(), timer, sink).unwrap();
    assert!(!session.finalizer().is_finalized());
    assert_eq!(recorded.borrow().results_calls, 0);
    drop(session);
    assert_eq!(recorded.borrow().results_calls, 1);
}
