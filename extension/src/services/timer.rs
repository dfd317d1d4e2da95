use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;
use solconnect_core::bridge::Timer;
use std::time::Duration;

pub struct GlooTimer;

#[async_trait(?Send)]
impl Timer for GlooTimer {
    async fn sleep(&self, duration: Duration) {
        TimeoutFuture::new(duration.as_millis().min(u32::MAX as u128) as u32).await;
    }
}
