//! Build a two-link chain, stop it mid-delay, continue it, restart it.
//!
//! ```bash
//! cargo run --example basic_chain
//! ```

use std::time::Duration;

use taskchain::{ActionFn, Task};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), taskchain::TaskError> {
    let hello = Task::once(ActionFn::unit(|_ctx| async {
        println!("hello,");
        Ok(())
    }))
    .with_name("greeter")
    .with_duration(Duration::from_secs(2))
    .on_stop(|| println!("(stopped)"))
    .on_cont(|| println!("(continued)"))
    .build()?;

    let world = Task::once(ActionFn::unit(|_ctx| async {
        println!("world!");
        Ok(())
    }))
    .build()?;

    hello.append(world)?;

    // Plain run: "hello," then, two seconds later, "world!".
    hello.start()?;
    hello.join().await?;

    // Stop one second into the delay, continue later: only the remaining
    // second is waited before "world!" appears.
    hello.start()?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    hello.stop()?;
    hello.join().await?;
    println!("state after stop: {:?}", hello.state());

    tokio::time::sleep(Duration::from_secs(1)).await;
    hello.cont()?;
    hello.join().await?;
    println!("state after cont: {:?}", hello.state());

    Ok(())
}
