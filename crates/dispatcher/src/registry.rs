use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notifier_core::{HandlerDescriptor, SubscriptionHandler};
use notifier_infrastructure::StructuredLogger;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// 通过 `configure` 认可的处理器集合
///
/// 只在第一次调度时计算一次，之后在进程生命周期内保持不变。
#[derive(Default)]
pub struct EndorsedHandlers {
    handlers: Vec<Arc<dyn SubscriptionHandler>>,
    index: HashMap<String, usize>,
}

impl EndorsedHandlers {
    fn push(&mut self, handler: Arc<dyn SubscriptionHandler>) {
        self.index
            .insert(handler.name().to_string(), self.handlers.len());
        self.handlers.push(handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SubscriptionHandler>> {
        self.index.get(name).map(|&i| &self.handlers[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 按注册顺序返回处理器名称
    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// 处理器注册表
///
/// 持有启动时创建的候选处理器。第一次调用 [`endorse`](Self::endorse) 时依次调用
/// 每个候选的 `configure`，返回 `true` 的处理器被认可；结果被缓存，
/// 失败的处理器不会再被重试。并发的首次调用只会触发一次配置。
pub struct HandlerRegistry {
    candidates: Option<Vec<Arc<dyn SubscriptionHandler>>>,
    endorsed: OnceCell<EndorsedHandlers>,
    no_handlers_warned: AtomicBool,
}

impl HandlerRegistry {
    pub fn new(candidates: Vec<Arc<dyn SubscriptionHandler>>) -> Self {
        Self {
            candidates: Some(candidates),
            endorsed: OnceCell::new(),
            no_handlers_warned: AtomicBool::new(false),
        }
    }

    /// 没有任何候选处理器的注册表，调度周期全部为空操作
    pub fn absent() -> Self {
        Self {
            candidates: None,
            endorsed: OnceCell::new(),
            no_handlers_warned: AtomicBool::new(false),
        }
    }

    pub async fn endorse(&self) -> &EndorsedHandlers {
        self.endorsed
            .get_or_init(|| Self::configure_candidates(self.candidates.as_deref().unwrap_or(&[])))
            .await
    }

    async fn configure_candidates(candidates: &[Arc<dyn SubscriptionHandler>]) -> EndorsedHandlers {
        let mut endorsed = EndorsedHandlers::default();
        let mut seen = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let name = candidate.name();
            if seen.contains(&name) {
                warn!("处理器名称 {} 重复，忽略后注册的处理器", name);
                continue;
            }
            seen.push(name);

            if candidate.configure().await {
                StructuredLogger::log_handler_endorsed(name);
                endorsed.push(Arc::clone(candidate));
            } else {
                StructuredLogger::log_handler_rejected(name);
            }
        }

        debug!("共认可 {} 个订阅处理器", endorsed.len());
        endorsed
    }

    /// 认可集合为空时只警告一次
    pub fn warn_no_handlers_once(&self) {
        if !self.no_handlers_warned.swap(true, Ordering::SeqCst) {
            StructuredLogger::log_no_handlers();
        }
    }

    /// 按名称查找候选处理器，不要求已被认可
    pub fn candidate(&self, name: &str) -> Option<Arc<dyn SubscriptionHandler>> {
        self.candidates
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|h| h.name() == name)
            .cloned()
    }

    /// 所有候选处理器的描述，名称重复时保留先注册的
    pub fn descriptors(&self) -> Vec<HandlerDescriptor> {
        let mut descriptors: Vec<HandlerDescriptor> = Vec::new();
        for handler in self.candidates.as_deref().unwrap_or(&[]) {
            if descriptors.iter().any(|d| d.name == handler.name()) {
                continue;
            }
            descriptors.push(HandlerDescriptor {
                name: handler.name().to_string(),
                properties: handler.properties(),
            });
        }
        descriptors
    }

    pub fn is_absent(&self) -> bool {
        self.candidates.is_none()
    }
}
