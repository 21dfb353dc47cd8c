//! 批量记录处理器 - 编排层
//!
//! ## 职责
//!
//! 把一批记录交给有界的 worker 池并发处理，按输入顺序返回结果。
//!
//! ## 核心功能
//!
//! 1. **并发控制**：使用 Semaphore 限制同时在途的模型调用数量
//! 2. **结果槽位**：第 i 条记录的槽位在派发前就已预留，完成后写入一次
//! 3. **批次中止**：任一记录鉴权失败时停止派发，已完成的结果保留
//! 4. **取消与时限**：外部取消或超过批次时限时停止派发，在途请求正常结束
//! 5. **进度通知**：通过 watch 通道发布 已完成/总数，不阻塞处理
//!
//! ## 设计特点
//!
//! - **无共享可变列表**：结果写入 `OnceLock` 槽位，不需要锁
//! - **只读共享**：`ColumnMapping` 与 `GenerationConfig` 通过 `Arc` 共享
//! - **向下委托**：单条记录的处理交给 `workflow::RecordFlow`

use crate::error::GenerationFailure;
use crate::models::generation::GenerationConfig;
use crate::models::mapping::ColumnMapping;
use crate::models::record::{ProductRecord, RecordIdentity};
use crate::models::result::GenerationResult;
use crate::services::ChatBackend;
use crate::workflow::{RecordCtx, RecordFlow};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 批次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    /// 所有记录都已派发并完成
    Completed,
    /// 鉴权失败导致中止
    Aborted,
    /// 外部取消或超过批次时限
    Cancelled,
}

impl BatchState {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchState::Idle => "idle",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Aborted => "aborted",
            BatchState::Cancelled => "cancelled",
        }
    }
}

/// 批次进度快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub state: BatchState,
    pub completed: usize,
    pub total: usize,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            state: BatchState::Idle,
            completed: 0,
            total: 0,
        }
    }
}

/// 调用方持有的批次控制句柄
///
/// - `cancel()` 停止派发新记录
/// - `subscribe()` 观察进度
#[derive(Debug, Clone)]
pub struct BatchControl {
    cancel: CancellationToken,
    progress: Arc<watch::Sender<BatchProgress>>,
}

impl BatchControl {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(BatchProgress::default());
        Self {
            cancel: CancellationToken::new(),
            progress: Arc::new(progress),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> BatchProgress {
        *self.progress.borrow()
    }

    fn publish(&self, progress: BatchProgress) {
        self.progress.send_replace(progress);
    }

    /// 发布运行中的完成数，已完成数只增不减
    fn publish_completed(&self, done: usize, total: usize) {
        self.progress.send_if_modified(|current| {
            if done <= current.completed {
                return false;
            }
            *current = BatchProgress {
                state: BatchState::Running,
                completed: done,
                total,
            };
            true
        });
    }
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

/// 批次报告
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub state: BatchState,
    /// 与输入顺序一致，长度等于记录数
    pub results: Vec<GenerationResult>,
    /// 中止原因（仅 `Aborted`）
    pub abort_reason: Option<GenerationFailure>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.failure().is_some()).count()
    }

    pub fn not_attempted_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, GenerationResult::NotAttempted { .. }))
            .count()
    }

    pub fn is_aborted(&self) -> bool {
        self.state == BatchState::Aborted
    }
}

/// 批量记录处理器
pub struct BatchOrchestrator<B> {
    flow: Arc<RecordFlow<B>>,
    max_concurrent: usize,
    deadline: Option<Duration>,
}

impl<B: ChatBackend> BatchOrchestrator<B> {
    /// # 参数
    /// - `flow`: 单条记录的处理流程
    /// - `max_concurrent`: 同时处理的记录数上限（至少为 1）
    pub fn new(flow: RecordFlow<B>, max_concurrent: usize) -> Self {
        Self {
            flow: Arc::new(flow),
            max_concurrent: max_concurrent.max(1),
            deadline: None,
        }
    }

    /// 设置批次时限，超过后按取消处理
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// 处理整批记录
    ///
    /// # 返回
    /// 结果数量总是等于记录数量，未派发的记录标记为 `NotAttempted`
    pub async fn run(
        &self,
        records: Vec<ProductRecord>,
        mapping: Arc<ColumnMapping>,
        config: Arc<GenerationConfig>,
        control: &BatchControl,
    ) -> BatchReport {
        let started_at = Local::now();
        let total = records.len();
        let identities: Vec<RecordIdentity> = records
            .iter()
            .map(|record| record.identity(mapping.identity_column()))
            .collect();

        let slots: Arc<Vec<OnceLock<GenerationResult>>> =
            Arc::new((0..total).map(|_| OnceLock::new()).collect());
        let abort_reason: Arc<OnceLock<GenerationFailure>> = Arc::new(OnceLock::new());
        let completed = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        // 外部取消或鉴权中止都会触发 halt
        let halt = control.cancel.child_token();
        let deadline = self.deadline.map(|d| Instant::now() + d);

        control.publish(BatchProgress {
            state: BatchState::Running,
            completed: 0,
            total,
        });
        info!(
            "📦 开始处理 {} 条记录 (并发上限: {})",
            total, self.max_concurrent
        );

        let mut handles = Vec::with_capacity(total);
        let mut dispatch_stopped = false;

        for (index, record) in records.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = halt.cancelled() => {
                    dispatch_stopped = true;
                    break;
                }
                _ = wait_deadline(deadline) => {
                    warn!("⏰ 超过批次时限，停止派发新记录");
                    halt.cancel();
                    dispatch_stopped = true;
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        dispatch_stopped = true;
                        break;
                    }
                },
            };

            let flow = self.flow.clone();
            let mapping = mapping.clone();
            let config = config.clone();
            let slots = slots.clone();
            let abort_reason = abort_reason.clone();
            let completed = completed.clone();
            let halt = halt.clone();
            let control = control.clone();
            let identity = identities[index].clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let mut ctx = RecordCtx::new(identity, index + 1, total);
                let result = flow.run(&mut ctx, &record, &mapping, &config).await;

                if let Some(failure) = result.failure().filter(|f| f.is_batch_fatal()) {
                    if abort_reason.set(failure.clone()).is_ok() {
                        error!("{} ❌ 鉴权失败，停止派发剩余记录: {}", ctx, failure);
                    }
                    halt.cancel();
                }

                let _ = slots[index].set(result);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                control.publish_completed(done, total);
            });
            handles.push((index, handle));
        }

        if dispatch_stopped {
            info!(
                "🛑 停止派发，已派发 {}/{} 条，等待在途请求结束...",
                handles.len(),
                total
            );
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;
        for (index, outcome) in indices.into_iter().zip(joined) {
            if let Err(e) = outcome {
                error!("[记录 {}] 任务执行失败: {}", identities[index], e);
                let _ = slots[index].set(GenerationResult::Failure {
                    identity: identities[index].clone(),
                    failure: GenerationFailure::Provider {
                        attempts: 1,
                        message: format!("任务执行失败: {}", e),
                    },
                });
            }
        }

        let results: Vec<GenerationResult> = slots
            .iter()
            .zip(identities)
            .map(|(slot, identity)| {
                slot.get()
                    .cloned()
                    .unwrap_or(GenerationResult::NotAttempted { identity })
            })
            .collect();

        let abort_reason = abort_reason.get().cloned();
        let state = if abort_reason.is_some() {
            BatchState::Aborted
        } else if dispatch_stopped {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };

        control.publish(BatchProgress {
            state,
            completed: completed.load(Ordering::SeqCst),
            total,
        });
        debug!("批次结束，状态: {}", state.as_str());

        BatchReport {
            state,
            results,
            abort_reason,
            started_at,
            finished_at: Local::now(),
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
