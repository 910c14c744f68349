use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use race_replay::{
    HostState, RaceCard, ReplayServer, SimResult, SimulationConfig, SimulationEngine, StrategyKind,
};

fn demo(name: &str) -> RaceCard {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    RaceCard::from_file(path).unwrap()
}

type Recorder = (SimulationEngine, Rc<RefCell<Vec<SimResult>>>, Rc<RefCell<u32>>);

fn recording_engine(card: &RaceCard, seed: u64) -> Recorder {
    let events = Rc::new(RefCell::new(Vec::new()));
    let all_done = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&events);
    let done = Rc::clone(&all_done);
    let engine = SimulationEngine::with_seed(
        card.runner_setups(),
        card.distance,
        &SimulationConfig::default(),
        Some(seed),
    )
    .on_runner_finish(move |r| sink.borrow_mut().push(r))
    .on_all_finish(move || *done.borrow_mut() += 1);
    (engine, events, all_done)
}

#[test]
fn past_race_finishes_in_recorded_order() {
    let card = demo("past_race.json");
    let (mut engine, events, all_done) = recording_engine(&card, 17);
    assert_eq!(engine.strategy_kind(), StrategyKind::RealResult);
    let duration = engine.expected_duration().unwrap();
    assert!((duration - 145.1).abs() < 1e-9);

    engine.start();
    for _ in 0..(160 * 60) {
        engine.update(1.0);
    }

    let events = events.borrow();
    let order: Vec<u32> = events.iter().map(|r| r.horse_number).collect();
    assert_eq!(order, vec![2, 1, 6, 5, 3]);

    let recorded = [(2, 144.3), (1, 144.5), (6, 144.6), (5, 144.9), (3, 145.1)];
    for (event, (number, time)) in events.iter().zip(recorded) {
        assert_eq!(event.horse_number, number);
        assert!(event.time >= time - 1e-9 && event.time < time + 0.02, "{event:?}");
    }

    // Horse 4 did not finish, so the race never completes
    assert!(!engine.is_finished());
    assert_eq!(*all_done.borrow(), 0);
    assert_eq!(engine.progress(3), 0.0);
}

#[test]
fn upcoming_race_runs_to_completion() {
    let card = demo("upcoming_race.json");
    let (mut engine, events, all_done) = recording_engine(&card, 99);
    assert_eq!(engine.strategy_kind(), StrategyKind::Probabilistic);

    engine.start();
    let mut frames = 0;
    while engine.is_playing() && frames < 600 * 60 {
        engine.update(1.0);
        frames += 1;
    }

    let mut numbers: Vec<u32> = events.borrow().iter().map(|r| r.horse_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(*all_done.borrow(), 1);
    assert!(engine.progress_all().iter().all(|p| *p == 2500.0));

    // Further ticks after completion are ignored
    engine.update(60.0);
    assert_eq!(events.borrow().len(), 5);
    assert_eq!(*all_done.borrow(), 1);
}

#[test]
fn seeking_back_and_forth_never_fires_finishes() {
    let card = demo("past_race.json");
    let (mut engine, events, _) = recording_engine(&card, 5);
    engine.start();

    engine.set_time(150.0);
    assert_eq!(engine.finished_count(), 5);
    engine.set_time(60.0);
    assert_eq!(engine.finished_count(), 0);
    engine.set_time(144.55);
    assert_eq!(engine.finished_count(), 2);
    assert!(events.borrow().is_empty());

    // Both finishers sit on the line; ties keep entry order
    let leaders: Vec<u32> = engine.standings()[..2]
        .iter()
        .map(|&i| engine.runners()[i].number)
        .collect();
    assert_eq!(leaders, vec![1, 2]);
}

#[test]
fn server_snapshots_are_drawable() {
    let card = demo("past_race.json");
    let mut server = ReplayServer::default().with_seed(1);
    server.load_race(&card);
    server.set_speed(8.0);
    server.play();

    for _ in 0..300 {
        let snapshot = server.tick(1.0).unwrap();
        assert_eq!(snapshot.runners.len(), 6);
        for runner in &snapshot.runners {
            assert!(runner.x.is_finite() && runner.y.is_finite() && runner.heading.is_finite());
            assert!(runner.progress >= 0.0 && runner.progress <= 2400.0);
        }
        assert_eq!(snapshot.standings.len(), 6);
    }

    assert_eq!(server.get_state(), HostState::Racing);
    let stats = server.get_stats();
    assert_eq!(stats.strategy, Some(StrategyKind::RealResult));
    assert_eq!(stats.runner_count, 6);
}
