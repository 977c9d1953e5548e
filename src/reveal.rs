//! Simulated typing of pre-written text.
//!
//! A [`Reveal`] turns a complete string into a timed stream of growing
//! prefixes, one character per step. The stream is driven by the tokio timer,
//! so a consumer can stop it between steps (see `IntakeSession`).

use std::time::Duration;

use futures::Stream;
use futures::stream;

/// Pre-written text plus the delay before each revealed character.
#[derive(Debug, Clone)]
pub struct Reveal {
    target: String,
    delay: Duration,
}

impl Reveal {
    pub fn new(target: impl Into<String>, delay: Duration) -> Self {
        Self {
            target: target.into(),
            delay,
        }
    }

    /// Number of steps the stream will yield (one per character).
    pub fn steps(&self) -> usize {
        self.target.chars().count()
    }

    /// Consume the reveal into its prefix stream.
    ///
    /// Each item is the previous one plus exactly one character; the last item
    /// is the full target. An empty target yields nothing.
    pub fn into_stream(self) -> impl Stream<Item = String> + Send + 'static {
        let Reveal { target, delay } = self;
        stream::unfold((target, 0usize), move |(target, pos)| async move {
            let ch = target[pos..].chars().next()?;
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            let end = pos + ch.len_utf8();
            let prefix = target[..end].to_string();
            Some((prefix, (target, end)))
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn yields_one_prefix_per_character() {
        let reveal = Reveal::new("q1?", Duration::from_millis(10));
        assert_eq!(reveal.steps(), 3);

        let steps: Vec<String> = reveal.into_stream().collect().await;
        assert_eq!(steps, vec!["q", "q1", "q1?"]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_step_extends_previous_by_one_char() {
        let target = "héllo wörld";
        let steps: Vec<String> = Reveal::new(target, Duration::from_millis(10))
            .into_stream()
            .collect()
            .await;

        assert_eq!(steps.len(), target.chars().count());
        let mut previous = String::new();
        for step in &steps {
            assert!(step.starts_with(&previous));
            assert_eq!(step.chars().count(), previous.chars().count() + 1);
            previous.clone_from(step);
        }
        assert_eq!(steps.last().unwrap(), target);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_before_every_step() {
        let start = Instant::now();
        let mut stream = Box::pin(Reveal::new("abcd", Duration::from_millis(25)).into_stream());

        let first = stream.next().await.unwrap();
        assert_eq!(first, "a");
        assert!(start.elapsed() >= Duration::from_millis(25));

        while stream.next().await.is_some() {}
        let total = start.elapsed();
        assert!(total >= Duration::from_millis(100));
        assert!(total < Duration::from_millis(110));
    }

    #[tokio::test]
    async fn empty_target_yields_nothing() {
        let steps: Vec<String> = Reveal::new("", Duration::ZERO)
            .into_stream()
            .collect()
            .await;
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn zero_delay_still_reveals_everything() {
        let steps: Vec<String> = Reveal::new("\nbye", Duration::ZERO)
            .into_stream()
            .collect()
            .await;
        assert_eq!(steps, vec!["\n", "\nb", "\nby", "\nbye"]);
    }
}
