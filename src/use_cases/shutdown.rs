use tokio::sync::watch;

// Process-wide shutdown flag shared by the engine loop and its strategy.
//
// Backed by a watch channel so a waiter observes a raise that happened
// before it started waiting.
#[derive(Debug)]
pub struct ShutdownSignal {
    flag: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag }
    }

    // Request shutdown and wake every suspended waiter.
    pub fn raise(&self) {
        self.flag.send_replace(true);
    }

    // Synchronous check used between units of work.
    pub fn is_raised(&self) -> bool {
        *self.flag.borrow()
    }

    // Suspend until the signal is raised.
    pub async fn raised(&self) {
        let mut rx = self.flag.subscribe();
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
