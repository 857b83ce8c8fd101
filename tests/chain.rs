mod common;

use std::error::Error;

use common::{assert_timeline, ms, note, sleep_ms, Recorder};
use taskchain::{concat, Activity, State, Task, TaskError};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn two_link_chain_runs_in_order() -> TestResult {
    let rec = Recorder::new();
    let hello = Task::once(note(&rec, "hello"))
        .with_duration(ms(2000))
        .build()?;
    let world = Task::once(note(&rec, "world")).build()?;
    hello.append(world)?;

    hello.start()?;
    hello.join().await?;

    assert_eq!(hello.state(), State::Finished);
    assert_timeline(&rec, &[("hello", 0), ("world", 2000)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restart_replays_the_chain() -> TestResult {
    let rec = Recorder::new();
    let chain = concat(
        Task::once(note(&rec, "a")).build()?,
        [Task::once(note(&rec, "b")).build()?],
    )?;

    chain.start()?;
    chain.join().await?;
    chain.start()?;
    chain.join().await?;

    assert_eq!(chain.state(), State::Finished);
    assert_eq!(rec.labels(), ["a", "b", "a", "b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_and_final_hooks_frame_the_run() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "work"))
        .with_duration(ms(500))
        .on_start(rec.hook("on_start"))
        .on_final(rec.hook("on_final"))
        .build()?;

    task.start()?;
    task.join().await?;

    assert_timeline(
        &rec,
        &[("on_start", 0), ("work", 0), ("on_final", 500)],
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_delay_is_honored_before_the_first_action() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "work"))
        .on_start(rec.hook("on_start"))
        .build()?;

    task.start_after(ms(800))?;
    sleep_ms(100).await;
    assert_eq!(task.status(), (State::Started, Activity::Sleep));
    task.join().await?;

    // The start hook fires after the delay, right before the chain.
    assert_timeline(&rec, &[("on_start", 800), ("work", 800)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_is_rejected_while_running() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "work"))
        .with_duration(ms(1000))
        .build()?;

    task.start()?;
    sleep_ms(100).await;
    assert!(matches!(
        task.start(),
        Err(TaskError::InvalidState { op: "start", .. })
    ));
    task.join().await?;

    // Idle again: restart is fine.
    task.start()?;
    task.join().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_is_rejected_before_the_first_start() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "work")).build()?;
    assert!(matches!(
        task.stop(),
        Err(TaskError::InvalidState { op: "stop", .. })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn join_on_a_created_task_returns_immediately() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "work")).build()?;
    task.join().await?;
    assert_eq!(task.state(), State::Created);
    assert!(rec.labels().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sleep_task_is_just_a_duration() -> TestResult {
    let rec = Recorder::new();
    let chain = concat(
        Task::sleep(ms(1500)).build()?,
        [Task::once(note(&rec, "after")).build()?],
    )?;

    chain.start()?;
    sleep_ms(200).await;
    assert_eq!(chain.status(), (State::Started, Activity::Sleep));
    chain.join().await?;

    assert_timeline(&rec, &[("after", 1500)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn run_inline_drives_the_chain_on_the_caller() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "inline"))
        .with_duration(ms(300))
        .build()?;

    task.run_inline().await?;

    assert_eq!(task.state(), State::Finished);
    assert_timeline(&rec, &[("inline", 0)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn join_works_on_an_inline_task_from_another_handle() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(note(&rec, "inline"))
        .with_duration(ms(1000))
        .build()?;

    let handle = task.clone();
    let joiner = tokio::spawn(async move {
        handle.join().await.map(|_| handle.state())
    });

    task.run_inline().await?;
    let observed = joiner.await??;
    assert_eq!(observed, State::Finished);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn busy_activity_is_visible_during_the_action() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(common::busy_note(&rec, "slow", ms(1000))).build()?;

    task.start()?;
    sleep_ms(400).await;
    assert_eq!(task.status(), (State::Started, Activity::Busy));
    task.join().await?;
    assert_eq!(task.status(), (State::Finished, Activity::None));
    Ok(())
}
