mod common;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{assert_timeline, control_script, ms, sleep_ms, Recorder};
use taskchain::{ActionFn, Control, State, Task};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn accelerating_gaps_follow_the_protocol() -> TestResult {
    // Returns 5,4,3,2,1 second gaps, then "again", then "done":
    // invocations land at 0, 5, 9, 12, 14, 15, 15.
    let rec = Recorder::new();
    let script = [
        Control::After(ms(5000)),
        Control::After(ms(4000)),
        Control::After(ms(3000)),
        Control::After(ms(2000)),
        Control::After(ms(1000)),
        Control::Again,
        Control::Done,
    ];
    let task = Task::repeated(control_script(&rec, "tick", &script)).build()?;

    task.start()?;
    task.join().await?;

    assert_eq!(task.state(), State::Finished);
    assert_timeline(
        &rec,
        &[
            ("tick", 0),
            ("tick", 5000),
            ("tick", 9000),
            ("tick", 12000),
            ("tick", 14000),
            ("tick", 15000),
            ("tick", 15000),
        ],
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn num_caps_the_loop() -> TestResult {
    let rec = Recorder::new();
    let task = Task::repeated(control_script(
        &rec,
        "tick",
        &[Control::Again; 100],
    ))
    .with_num(4)
    .build()?;

    task.start()?;
    task.join().await?;

    assert_eq!(task.state(), State::Finished);
    assert_eq!(rec.labels().len(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cap_and_done_are_equivalent_terminators() -> TestResult {
    // Done on the third call, cap of three: whichever fires first ends the
    // loop; either way there are exactly three invocations.
    let rec = Recorder::new();
    let task = Task::repeated(control_script(
        &rec,
        "tick",
        &[Control::Again, Control::Again, Control::Done],
    ))
    .with_num(3)
    .build()?;

    task.start()?;
    task.join().await?;
    assert_eq!(rec.labels().len(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn gap_is_measured_from_invocation_start_by_default() -> TestResult {
    // The action takes 1s and asks for a 3s gap: brutto, the next call
    // lands 3s after the previous one STARTED.
    let rec = Recorder::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let action = {
        let rec = rec.clone();
        let calls = calls.clone();
        ActionFn::arc(move |_ctx| {
            let rec = rec.clone();
            let calls = calls.clone();
            async move {
                rec.mark("tick");
                tokio::time::sleep(ms(1000)).await;
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Control::After(ms(3000)))
                } else {
                    Ok(Control::Done)
                }
            }
        })
    };
    let task = Task::repeated(action).build()?;
    task.start()?;
    task.join().await?;

    assert_timeline(&rec, &[("tick", 0), ("tick", 3000)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn netto_time_counts_the_action_extra() -> TestResult {
    let rec = Recorder::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let action = {
        let rec = rec.clone();
        let calls = calls.clone();
        ActionFn::arc(move |_ctx| {
            let rec = rec.clone();
            let calls = calls.clone();
            async move {
                rec.mark("tick");
                tokio::time::sleep(ms(1000)).await;
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Control::After(ms(3000)))
                } else {
                    Ok(Control::Done)
                }
            }
        })
    };
    let task = Task::repeated(action).with_netto_time(true).build()?;
    task.start()?;
    task.join().await?;

    // 1s of action + full 3s gap.
    assert_timeline(&rec, &[("tick", 0), ("tick", 4000)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_mid_gap_preserves_the_countdown() -> TestResult {
    let rec = Recorder::new();
    let task = Task::repeated(control_script(
        &rec,
        "tick",
        &[Control::After(ms(4000)), Control::Done],
    ))
    .on_stop(rec.hook("on_stop"))
    .on_cont(rec.hook("on_cont"))
    .build()?;

    task.start()?;
    sleep_ms(1000).await;
    task.stop()?;
    task.join().await?;
    assert_eq!(task.state(), State::Stopped);

    sleep_ms(9000).await; // t = 10s
    task.cont()?;
    task.join().await?;
    assert_eq!(task.state(), State::Finished);

    // 3s of the gap remained: the second invocation lands at 13s.
    assert_timeline(
        &rec,
        &[
            ("tick", 0),
            ("on_stop", 1000),
            ("on_cont", 10000),
            ("tick", 13000),
        ],
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn num_is_rejected_on_single_shot_tasks() {
    let rec = Recorder::new();
    let res = Task::once(control_script(&rec, "x", &[]))
        .with_num(2)
        .build();
    assert!(matches!(
        res,
        Err(taskchain::TaskError::InvalidArgument { .. })
    ));

    let res = Task::repeated(control_script(&rec, "x", &[])).with_num(0).build();
    assert!(matches!(
        res,
        Err(taskchain::TaskError::InvalidArgument { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn repeated_loop_honours_a_trailing_duration() -> TestResult {
    // Two immediate calls, then the link's duration pads the total to 2s.
    let rec = Recorder::new();
    let task = Task::repeated(control_script(
        &rec,
        "tick",
        &[Control::Again, Control::Done],
    ))
    .with_duration(ms(2000))
    .on_final(rec.hook("on_final"))
    .build()?;

    task.start()?;
    task.join().await?;

    assert_timeline(
        &rec,
        &[("tick", 0), ("tick", 0), ("on_final", 2000)],
    );
    Ok(())
}
