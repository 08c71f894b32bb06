//! Analysis Engine Adapter Tests
//!
//! Drives [`AnalysisEngine`] against a scripted engine on the far end of an
//! in-memory link. The script reads the commands the adapter writes and
//! answers with raw UCI lines.

use std::time::Duration;
use stockfish_bridge::{
    AnalysisEngine, AnalysisResult, AnalysisUpdate, EngineConfig, EngineError, EngineLink,
    EngineState, Score, ScriptedEnd,
};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4_FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

fn fast_config() -> EngineConfig {
    EngineConfig {
        stop_grace_ms: 5,
        best_move_grace_ms: 100,
        ready_timeout_ms: 200,
        ..EngineConfig::default()
    }
}

async fn wait_for_state(engine: &AnalysisEngine, state: EngineState) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while engine.state() != state {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("engine should reach the expected state");
}

async fn expect_command(end: &mut ScriptedEnd, expected: &str) {
    let command = tokio::time::timeout(Duration::from_secs(1), end.next_command())
        .await
        .expect("adapter should send a command")
        .expect("command channel should be open");
    assert_eq!(command, expected);
}

/// Open an adapter, swallow the handshake and answer `readyok`
async fn ready_engine() -> (AnalysisEngine, ScriptedEnd) {
    let (link, mut end) = EngineLink::in_memory();
    let engine = AnalysisEngine::with_link(fast_config(), link);
    for _ in 0..fast_config().handshake().len() {
        end.next_command().await.expect("handshake command");
    }
    end.say("readyok");
    wait_for_state(&engine, EngineState::Ready).await;
    (engine, end)
}

#[tokio::test]
async fn test_handshake_then_ready() {
    let (link, mut end) = EngineLink::in_memory();
    let engine = AnalysisEngine::with_link(fast_config(), link);
    assert_eq!(engine.state(), EngineState::Initializing);

    for expected in [
        "uci",
        "isready",
        "setoption name Threads value 4",
        "setoption name Hash value 32",
        "setoption name Skill Level value 20",
        "setoption name UCI_AnalyseMode value false",
    ] {
        expect_command(&mut end, expected).await;
    }

    end.say("id name Stockfish 16");
    end.say("uciok");
    assert_eq!(engine.state(), EngineState::Initializing);

    end.say("readyok");
    wait_for_state(&engine, EngineState::Ready).await;
    assert!(engine.is_available());
}

#[tokio::test]
async fn test_request_before_readyok_times_out() {
    let (link, _end) = EngineLink::in_memory();
    let engine = AnalysisEngine::with_link(fast_config(), link);

    let result = engine.evaluate_position(START_FEN, 10).await;
    assert!(matches!(result, Err(EngineError::NotReady { timeout_ms: 200 })));
}

#[tokio::test]
async fn test_evaluation_publishes_complete_info_only() {
    let (engine, mut end) = ready_engine().await;
    let mut updates = engine.subscribe();

    let token = engine
        .evaluate_position(START_FEN, 12)
        .await
        .expect("evaluation should start");
    expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
    expect_command(&mut end, "go depth 12").await;
    assert_eq!(engine.state(), EngineState::Searching);

    end.say("info depth 1 currmove e2e4 currmovenumber 1");
    end.say("info string NNUE evaluation using nn-5af11540bbfe.nnue");
    end.say("info depth 8 seldepth 11 score cp 31 nodes 4120 pv e2e4 e7e5 g1f3");
    end.say("bestmove e2e4 ponder e7e5");

    let first = updates.recv().await.expect("evaluation update");
    assert_eq!(
        first,
        AnalysisUpdate {
            token,
            result: AnalysisResult::Evaluation {
                depth: 8,
                score: Score::Centipawns(31),
                pv: vec!["e2e4".into(), "e7e5".into(), "g1f3".into()],
            },
        }
    );

    let second = updates.recv().await.expect("best move update");
    assert_eq!(
        second,
        AnalysisUpdate {
            token,
            result: AnalysisResult::BestMove {
                depth: Some(8),
                best_move: Some("e2e4".into()),
            },
        }
    );
    wait_for_state(&engine, EngineState::Ready).await;
}

#[tokio::test]
async fn test_new_evaluation_supersedes_running_one() {
    let (engine, mut end) = ready_engine().await;
    let mut updates = engine.subscribe();

    let first = engine.evaluate_position(START_FEN, 20).await.expect("first");
    expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
    expect_command(&mut end, "go depth 20").await;

    let second = engine.evaluate_position(AFTER_E4_FEN, 16).await.expect("second");
    assert!(second > first);
    expect_command(&mut end, "stop").await;
    expect_command(&mut end, &format!("position fen {}", AFTER_E4_FEN)).await;
    expect_command(&mut end, "go depth 16").await;

    // Output of the stopped search arrives after the new one was issued
    end.say("info depth 14 score cp 40 pv e2e4");
    end.say("bestmove e2e4");
    end.say("info depth 3 score mate -2 pv d7d5");

    let update = updates.recv().await.expect("update");
    assert_eq!(update.token, second);
    assert_eq!(
        update.result,
        AnalysisResult::Evaluation {
            depth: 3,
            score: Score::Mate(-2),
            pv: vec!["d7d5".into()],
        }
    );
}

#[tokio::test]
async fn test_best_move_resolves_with_engine_move() {
    let (engine, mut end) = ready_engine().await;
    let budget = Duration::from_millis(300);

    let script = async {
        expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
        expect_command(&mut end, "go movetime 300").await;
        end.say("info depth 10 score cp 22 pv g1f3");
        end.say("bestmove g1f3 ponder d7d5");
    };
    let (best, ()) = tokio::join!(engine.get_best_move(START_FEN, budget), script);

    assert_eq!(best.as_deref(), Some("g1f3"));
    wait_for_state(&engine, EngineState::Ready).await;
}

#[tokio::test]
async fn test_two_quick_best_move_requests_only_second_resolves() {
    //! The first caller is superseded and must not receive either move
    let (engine, mut end) = ready_engine().await;
    let budget = Duration::from_millis(300);

    let script = async {
        expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
        expect_command(&mut end, "go movetime 300").await;
        expect_command(&mut end, "stop").await;
        // The stopped search still reports its own best move
        end.say("bestmove e2e4");
        expect_command(&mut end, &format!("position fen {}", AFTER_E4_FEN)).await;
        expect_command(&mut end, "go movetime 300").await;
        end.say("bestmove c7c5");
    };

    let (first, second, ()) = tokio::join!(
        engine.get_best_move(START_FEN, budget),
        engine.get_best_move(AFTER_E4_FEN, budget),
        script
    );

    assert_eq!(first, None);
    assert_eq!(second.as_deref(), Some("c7c5"));
}

#[tokio::test]
async fn test_best_move_times_out_when_engine_is_silent() {
    let (engine, mut end) = ready_engine().await;

    let best = tokio::time::timeout(
        Duration::from_secs(2),
        engine.get_best_move(START_FEN, Duration::from_millis(50)),
    )
    .await
    .expect("get_best_move must not hang");
    assert_eq!(best, None);

    expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
    expect_command(&mut end, "go movetime 50").await;
    expect_command(&mut end, "stop").await;
}

#[tokio::test]
async fn test_best_move_none_sentinel() {
    let (engine, mut end) = ready_engine().await;

    let script = async {
        expect_command(&mut end, &format!("position fen {}", START_FEN)).await;
        expect_command(&mut end, "go movetime 100").await;
        end.say("bestmove (none)");
    };
    let (best, ()) = tokio::join!(
        engine.get_best_move(START_FEN, Duration::from_millis(100)),
        script
    );
    assert_eq!(best, None);
}

#[tokio::test]
async fn test_disabled_adapter_is_a_no_op() {
    let engine = AnalysisEngine::disabled(fast_config());
    assert!(!engine.is_available());
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert_eq!(
        engine.get_best_move(START_FEN, Duration::from_millis(10)).await,
        None
    );
    assert!(matches!(
        engine.evaluate_position(START_FEN, 5).await,
        Err(EngineError::Unavailable)
    ));
}

#[tokio::test]
async fn test_spawn_failure_degrades_to_disabled() {
    let config = EngineConfig {
        path: "/nonexistent/path/to/stockfish".into(),
        ..fast_config()
    };
    let engine = AnalysisEngine::open(config);
    assert!(!engine.is_available());
    assert_eq!(
        engine.get_best_move(START_FEN, Duration::from_millis(10)).await,
        None
    );
}

#[tokio::test]
async fn test_set_difficulty_clamps_skill_level() {
    let (engine, mut end) = ready_engine().await;
    engine.set_difficulty(35);
    expect_command(&mut end, "setoption name Skill Level value 20").await;
    engine.set_difficulty(-1);
    expect_command(&mut end, "setoption name Skill Level value 0").await;
}

#[tokio::test]
async fn test_terminate_resets_state() {
    let (mut engine, mut end) = ready_engine().await;
    engine.terminate();
    expect_command(&mut end, "quit").await;

    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(!engine.is_available());
    assert_eq!(
        engine.get_best_move(START_FEN, Duration::from_millis(10)).await,
        None
    );
}

#[tokio::test]
async fn test_engine_exit_marks_terminated() {
    let (engine, end) = ready_engine().await;
    drop(end);

    wait_for_state(&engine, EngineState::Terminated).await;
    assert!(!engine.is_available());
    assert!(matches!(
        engine.evaluate_position(START_FEN, 5).await,
        Err(EngineError::Terminated)
    ));
    assert_eq!(
        engine.get_best_move(START_FEN, Duration::from_millis(10)).await,
        None
    );
}
