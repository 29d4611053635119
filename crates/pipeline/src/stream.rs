//! 비동기 스트림과 fan-out/fan-in 조합자
//!
//! 스트림은 무제한 큐 위에 "더 이상 항목 없음" 신호를 얹은 것입니다.
//! 쓰기는 절대 대기하지 않으며, 모든 [`StreamWriter`] 클론이 drop되는 순간
//! 스트림이 완료됩니다. 단계가 패닉이나 조기 반환으로 끝나더라도 writer가
//! drop되므로 읽는 쪽이 영원히 대기하는 일은 없습니다.
//!
//! - [`split`]: 입력을 `n`개 레인으로 라운드로빈 분배
//! - [`merge`]: 여러 입력을 하나로 합치고, 모든 입력이 끝난 뒤에만 완료

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::warn;

use sbomforge_core::types::FileValidationResult;

/// 스트림 쓰기 핸들
///
/// 복제 가능하며, 마지막 클론이 drop되면 스트림이 완료됩니다.
pub struct StreamWriter<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for StreamWriter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> StreamWriter<T> {
    /// 항목을 씁니다. 대기하지 않습니다.
    ///
    /// 읽는 쪽이 이미 사라졌으면 `false`를 반환하고 항목은 버려집니다.
    pub fn write(&self, item: T) -> bool {
        self.tx.send(item).is_ok()
    }

    /// 이 핸들의 완료를 명시적으로 알립니다.
    pub fn complete(self) {}
}

/// 스트림 읽기 핸들
pub struct StreamReader<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> StreamReader<T> {
    /// 다음 항목을 읽습니다. 스트림이 비었고 완료되었으면 `None`.
    pub async fn read(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// 스트림을 끝까지 읽어 모읍니다.
    pub async fn collect(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }

    /// 주어진 항목을 담고 이미 완료된 스트림을 만듭니다.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let (writer, reader) = channel();
        for item in items {
            writer.write(item);
        }
        reader
    }

    /// 항목 없이 완료된 스트림
    pub fn empty() -> Self {
        let (_, reader) = channel();
        reader
    }
}

/// 새 스트림을 만듭니다.
pub fn channel<T>() -> (StreamWriter<T>, StreamReader<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StreamWriter { tx }, StreamReader { rx })
}

/// 에러 스트림 쓰기 핸들
pub type ErrorWriter = StreamWriter<FileValidationResult>;

/// 에러 스트림 읽기 핸들
pub type ErrorReader = StreamReader<FileValidationResult>;

/// 단계 출력: 결과 스트림과 에러 스트림 쌍
pub struct StageOutput<T> {
    pub items: StreamReader<T>,
    pub errors: ErrorReader,
}

impl<T> StageOutput<T> {
    pub fn new(items: StreamReader<T>, errors: ErrorReader) -> Self {
        Self { items, errors }
    }

    /// 두 스트림을 동시에 끝까지 읽습니다.
    pub async fn collect(self) -> (Vec<T>, Vec<FileValidationResult>) {
        tokio::join!(self.items.collect(), self.errors.collect())
    }
}

/// 입력을 `n`개 출력으로 라운드로빈 분배합니다.
///
/// 항목 `i`는 출력 `i mod n`으로 갑니다. 입력이 완료되면 모든 출력이 완료됩니다.
/// 한 레인 안에서는 도착 순서가 유지됩니다. `n`이 0이면 1로 취급합니다.
pub fn split<T: Send + 'static>(mut input: StreamReader<T>, n: usize) -> Vec<StreamReader<T>> {
    let n = n.max(1);
    let (writers, readers): (Vec<StreamWriter<T>>, Vec<StreamReader<T>>) =
        (0..n).map(|_| channel()).unzip();

    tokio::spawn(async move {
        let mut counter: usize = 0;
        while let Some(item) = input.read().await {
            writers[counter % n].write(item);
            counter = counter.wrapping_add(1);
        }
        // writers drop -> 모든 출력 완료
    });

    readers
}

/// 여러 입력을 하나의 출력으로 합칩니다.
///
/// 입력마다 리다이렉터 태스크 하나가 항목을 복사합니다. 출력은 모든 리다이렉터가
/// 끝난 뒤에만 완료되므로, 빨리 끝난 입력이 출력을 먼저 닫지 않습니다.
/// 레인 간 순서는 보장하지 않습니다.
pub fn merge<T: Send + 'static>(inputs: Vec<StreamReader<T>>) -> StreamReader<T> {
    let (writer, reader) = channel();

    tokio::spawn(async move {
        let mut redirectors = JoinSet::new();
        for mut input in inputs {
            let writer = writer.clone();
            redirectors.spawn(async move {
                while let Some(item) = input.read().await {
                    writer.write(item);
                }
            });
        }
        drop(writer);

        while let Some(result) = redirectors.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "merge redirector task failed");
            }
        }
    });

    reader
}
