use criterion::BenchmarkGroup;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use std::hint::black_box;
use tarazed::core::ProcessId;
use tarazed::dist::MemoryTransport;
use tarazed::erts::Match;
use tarazed::erts::Process;
use tarazed::erts::ReceivePort;
use tarazed::erts::SendPort;
use tarazed::node::Node;
use tarazed::node::RemoteTable;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

const BATCHES: &[u64] = &[1, 64, 1024];

fn runtime() -> Runtime {
  tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .unwrap()
}

async fn node(hub: &MemoryTransport, address: &str) -> Node {
  Node::create(hub.clone(), address, RemoteTable::new()).await.unwrap()
}

/// Spawns a process on `node` that counts `count` messages and reports back.
fn sink(node: &Node, count: u64) -> (ProcessId, oneshot::Receiver<u64>) {
  let (tx, rx) = oneshot::channel();

  let pid: ProcessId = node.spawn(async move {
    let mut total: u64 = 0;

    for _ in 0..count {
      total += Process::receive::<u64>().await;
    }

    let _ignore: Result<(), u64> = tx.send(total);
  });

  (pid, rx)
}

fn bench_local(criterion: &mut Criterion) {
  let runtime: Runtime = runtime();
  let hub: MemoryTransport = MemoryTransport::new();
  let node: Node = runtime.block_on(node(&hub, "bench-local"));

  let mut group: BenchmarkGroup<'_, WallTime> = criterion.benchmark_group("mailbox/local");

  for &count in BATCHES {
    group.throughput(Throughput::Elements(count));

    group.bench_with_input(BenchmarkId::new("send-receive", count), &count, |bench, &count| {
      bench.to_async(&runtime).iter(|| async {
        let (pid, done) = sink(&node, count);

        for value in 0..count {
          node.send(pid, value);
        }

        black_box(done.await.unwrap());
      })
    });

    group.bench_with_input(BenchmarkId::new("selective", count), &count, |bench, &count| {
      bench.to_async(&runtime).iter(|| async {
        let (tx, rx) = oneshot::channel();

        let pid: ProcessId = node.spawn(async move {
          let mut total: u64 = 0;

          // Every u64 sits behind a string the receive skips over.
          for _ in 0..count {
            total += Process::receive_match(vec![Match::new(|value: u64| value)]).await;
          }

          let _ignore: Result<(), u64> = tx.send(total);
        });

        for value in 0..count {
          node.send(pid, String::from("noise"));
          node.send(pid, value);
        }

        black_box(rx.await.unwrap());
      })
    });
  }

  group.finish();
  runtime.block_on(node.shutdown());
}

fn bench_channel(criterion: &mut Criterion) {
  let runtime: Runtime = runtime();
  let hub: MemoryTransport = MemoryTransport::new();
  let node: Node = runtime.block_on(node(&hub, "bench-channel"));

  let mut group: BenchmarkGroup<'_, WallTime> = criterion.benchmark_group("mailbox/channel");

  for &count in BATCHES {
    group.throughput(Throughput::Elements(count));

    group.bench_with_input(BenchmarkId::new("send-recv", count), &count, |bench, &count| {
      bench.to_async(&runtime).iter(|| async {
        let (send, mut recv): (SendPort<u64>, ReceivePort<u64>) = node.new_channel();

        for value in 0..count {
          send.send(value);
        }

        for _ in 0..count {
          black_box(recv.recv().await);
        }
      })
    });
  }

  group.finish();
  runtime.block_on(node.shutdown());
}

fn bench_remote(criterion: &mut Criterion) {
  let runtime: Runtime = runtime();
  let hub: MemoryTransport = MemoryTransport::new();
  let local: Node = runtime.block_on(node(&hub, "bench-a"));
  let remote: Node = runtime.block_on(node(&hub, "bench-b"));

  runtime.block_on(local.connect(remote.address())).unwrap();

  let mut group: BenchmarkGroup<'_, WallTime> = criterion.benchmark_group("mailbox/remote");

  for &count in BATCHES {
    group.throughput(Throughput::Elements(count));

    group.bench_with_input(BenchmarkId::new("send-receive", count), &count, |bench, &count| {
      bench.to_async(&runtime).iter(|| async {
        let (pid, done) = sink(&remote, count);

        for value in 0..count {
          local.send(pid, value);
        }

        black_box(done.await.unwrap());
      })
    });
  }

  group.finish();

  runtime.block_on(async {
    local.shutdown().await;
    remote.shutdown().await;
  });
}

criterion_group!(benches, bench_local, bench_channel, bench_remote);
criterion_main!(benches);
