//! Structured-concurrency tests: fork/join, parallel zip wall-clock,
//! racing with cancellation, and timeout.
//!
//! Timing assertions use generous margins: the point is "parallel, not
//! sequential" and "resolved by the fast side", not precise durations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use effectus::control::Either;
use effectus::effect::{Executor, FiberZip, Outcome, ParZip, Program, either, par_zip2};
use rstest::rstest;

fn test_executor() -> (tokio::runtime::Runtime, Arc<dyn Executor>) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let executor: Arc<dyn Executor> = Arc::new(runtime.handle().clone());
    (runtime, executor)
}

fn sleepy(duration: Duration, value: i32) -> Program<(), String, i32> {
    Program::sleep(duration).map(move |()| value)
}

#[rstest]
fn fork_returns_before_the_work_completes() {
    let (_runtime, executor) = test_executor();

    let program = sleepy(Duration::from_millis(300), 1)
        .fork(&executor)
        .map(|fiber| fiber.is_completed());

    let start = Instant::now();
    let outcome = program.eval(Arc::new(()));
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(outcome, Outcome::success(false));
}

#[rstest]
fn par_zip_runs_branches_concurrently() {
    let (_runtime, executor) = test_executor();
    let branch_duration = Duration::from_millis(400);

    let program = par_zip2(
        sleepy(branch_duration, 1),
        sleepy(branch_duration, 2),
        |a, b| a + b,
        &executor,
    );

    let start = Instant::now();
    let outcome = program.eval(Arc::new(()));
    let elapsed = start.elapsed();

    assert_eq!(outcome, Outcome::success(3));
    // Roughly one branch duration, not the sum of both.
    assert!(elapsed >= Duration::from_millis(350), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(750), "elapsed {elapsed:?}");
}

#[rstest]
fn par_zip_short_circuits_on_the_first_failure() {
    let (_runtime, executor) = test_executor();

    let failing: Program<(), String, i32> = Program::failure("left".to_string());
    let program = (failing, sleepy(Duration::from_millis(100), 2))
        .par_zip_with(|(a, b)| a + b, &executor);

    assert_eq!(
        program.eval(Arc::new(())),
        Outcome::failure("left".to_string())
    );
}

#[rstest]
fn fiber_zip_failure_does_not_cancel_siblings() {
    let (_runtime, executor) = test_executor();

    let sibling_finished = Arc::new(AtomicBool::new(false));
    let finished_flag = Arc::clone(&sibling_finished);

    let failing: Program<(), String, i32> = Program::failure("first".to_string());
    let sibling: Program<(), String, i32> = Program::sleep(Duration::from_millis(300))
        .map(move |()| {
            finished_flag.store(true, Ordering::SeqCst);
            2
        });

    let program = failing.fork(&executor).flat_map({
        let executor = Arc::clone(&executor);
        move |first| {
            sibling.fork(&executor).flat_map(move |second| {
                let sibling_token = second.cancel_token();
                (first, second)
                    .zip_with(|(a, b)| a + b)
                    .peek_error(move |_| assert!(!sibling_token.is_cancelled()))
            })
        }
    });

    assert_eq!(
        program.eval(Arc::new(())),
        Outcome::failure("first".to_string())
    );

    // The sibling keeps running to completion on the pool.
    std::thread::sleep(Duration::from_millis(600));
    assert!(sibling_finished.load(Ordering::SeqCst));
}

#[rstest]
fn either_resolves_with_the_fast_side_and_cancels_the_slow_one() {
    let (_runtime, executor) = test_executor();

    let slow = sleepy(Duration::from_secs(1), 1);
    let fast = sleepy(Duration::from_millis(100), 2);

    let tokens = Arc::new(parking_lot::Mutex::new(None));
    let captured = Arc::clone(&tokens);

    let program = slow.fork(&executor).flat_map({
        let executor = Arc::clone(&executor);
        move |slow_fiber| {
            fast.fork(&executor).flat_map(move |fast_fiber| {
                *captured.lock() = Some((slow_fiber.cancel_token(), fast_fiber.cancel_token()));
                either(slow_fiber, fast_fiber)
            })
        }
    });

    let start = Instant::now();
    let outcome = program.eval(Arc::new(()));
    let elapsed = start.elapsed();

    assert_eq!(outcome, Outcome::success(Either::Right(2)));
    assert!(elapsed < Duration::from_millis(700), "elapsed {elapsed:?}");

    // Both cancellation attempts happened, loser included.
    let (slow_token, fast_token) = tokens.lock().take().unwrap();
    assert!(slow_token.is_cancelled());
    assert!(fast_token.is_cancelled());
}

#[rstest]
fn either_surfaces_the_winning_failure() {
    let (_runtime, executor) = test_executor();

    let slow = sleepy(Duration::from_millis(500), 1);
    let failing: Program<(), String, i32> = Program::sleep(Duration::from_millis(50))
        .then(Program::failure("fast loser".to_string()));

    let program = slow.fork(&executor).flat_map({
        let executor = Arc::clone(&executor);
        move |first| {
            failing
                .fork(&executor)
                .flat_map(move |second| either(first, second))
        }
    });

    assert_eq!(
        program.eval(Arc::new(())),
        Outcome::failure("fast loser".to_string())
    );
}

#[rstest]
fn timeout_raises_when_the_timer_wins() {
    let (_runtime, executor) = test_executor();

    let program = sleepy(Duration::from_millis(800), 1)
        .timeout(Duration::from_millis(150), &executor)
        .catch_all(|uncaught| Program::failure(uncaught.message().to_string()));

    let start = Instant::now();
    let outcome = program.eval(Arc::new(()));
    let elapsed = start.elapsed();

    match outcome {
        Outcome::Failure(message) => assert!(
            message.contains("timed out"),
            "unexpected message: {message}"
        ),
        Outcome::Success(value) => panic!("expected a timeout, got {value}"),
    }
    assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");
}

#[rstest]
fn timeout_passes_through_a_fast_enough_value() {
    let (_runtime, executor) = test_executor();

    let program = sleepy(Duration::from_millis(50), 42)
        .timeout(Duration::from_millis(400), &executor);

    assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
}

#[rstest]
fn timeout_propagates_a_fast_domain_failure_untouched() {
    let (_runtime, executor) = test_executor();

    let program = Program::<(), String, i32>::failure("domain".to_string())
        .timeout(Duration::from_millis(400), &executor);

    assert_eq!(
        program.eval(Arc::new(())),
        Outcome::failure("domain".to_string())
    );
}

#[rstest]
fn par_zip_at_higher_arity_combines_all_branches() {
    let (_runtime, executor) = test_executor();

    let program = (
        sleepy(Duration::from_millis(100), 1),
        sleepy(Duration::from_millis(100), 2),
        sleepy(Duration::from_millis(100), 3),
        sleepy(Duration::from_millis(100), 4),
        sleepy(Duration::from_millis(100), 5),
    )
        .par_zip_with(|(a, b, c, d, e)| a + b + c + d + e, &executor);

    let start = Instant::now();
    assert_eq!(program.eval(Arc::new(())), Outcome::success(15));
    assert!(start.elapsed() < Duration::from_millis(450));
}
