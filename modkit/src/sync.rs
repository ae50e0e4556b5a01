use std::sync::{Mutex, MutexGuard, PoisonError};

/// 获取互斥锁；持锁线程 panic 后仍返回内部数据（状态记录不依赖临界区完整性）
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
