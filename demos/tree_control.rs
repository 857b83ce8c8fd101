//! Parent/child propagation with the built-in logger observer.
//!
//! A parent polls a flag every second while a delayed child eventually sets
//! it; stopping the parent stops the child, continuing resumes both.
//!
//! ```bash
//! cargo run --example tree_control --features logging
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskchain::{concat, ActionFn, Control, LogWriter, Task};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), taskchain::TaskError> {
    let flag = Arc::new(AtomicBool::new(false));

    let child = {
        let flag = flag.clone();
        Task::once(ActionFn::unit(move |_ctx| {
            let flag = flag.clone();
            async move {
                println!("child: setting the flag");
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        }))
        .with_name("setter")
        .build()?
    };

    let poll = {
        let flag = flag.clone();
        ActionFn::arc(move |_ctx| {
            let flag = flag.clone();
            async move {
                let set = flag.load(Ordering::SeqCst);
                println!("parent: flag is {set}");
                Ok(Control::from(set))
            }
        })
    };

    let parent = concat(
        Task::starts_after(&child, Duration::from_millis(4500))
            .with_name("watcher")
            .build()?,
        [Task::periodic(Duration::from_secs(1), poll).build()?],
    )?;
    parent.observe(Arc::new(LogWriter));

    parent.start()?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    parent.stop()?;
    parent.join().await?;

    tokio::time::sleep(Duration::from_millis(1000)).await;
    parent.cont()?;
    parent.join().await?;

    println!("parent: {:?}, child: {:?}", parent.state(), child.state());
    Ok(())
}
