mod common;

use std::time::Duration;
use tarazed::core::Exit;
use tarazed::core::MonitorRef;
use tarazed::core::ProcessId;
use tarazed::erts::DownMessage;
use tarazed::erts::Envelope;
use tarazed::erts::ExitMessage;
use tarazed::erts::Match;
use tarazed::erts::Process;
use tarazed::erts::ProcessFlags;
use tarazed::erts::ProcessInfo;
use tarazed::erts::SpawnConfig;
use tarazed::erts::SpawnHandle;
use tarazed::error::Exception;
use tarazed::error::ExceptionGroup;
use tarazed::node::Node;

use self::common::results;

// -----------------------------------------------------------------------------
// Mailbox
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_mailbox_fifo_per_sender() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Vec<u32>>();

  let pid: ProcessId = node.spawn(async move {
    let mut seen: Vec<u32> = Vec::new();

    for _ in 0..5 {
      seen.push(Process::receive::<u32>().await);
    }

    tx.send(seen).unwrap();
  });

  for value in 0..5_u32 {
    node.send(pid, value);
  }

  assert_eq!(rx.next().await, vec![0, 1, 2, 3, 4]);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_selective_receive_keeps_skipped_order() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<String>();
  let (ready_tx, mut ready) = results::<()>();

  let pid: ProcessId = node.spawn(async move {
    let () = Process::receive::<()>().await;
    let number: u32 = Process::receive::<u32>().await;

    tx.send(format!("number {number}")).unwrap();

    for _ in 0..2 {
      let text: String = Process::receive::<String>().await;
      tx.send(text).unwrap();
    }

    ready_tx.send(()).unwrap();
  });

  node.send(pid, String::from("first"));
  node.send(pid, 7_u32);
  node.send(pid, String::from("second"));
  node.send(pid, ());

  assert_eq!(rx.next().await, "number 7");
  assert_eq!(rx.next().await, "first");
  assert_eq!(rx.next().await, "second");

  ready.next().await;
  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_receive_match_first_clause_wins() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<String>();

  let pid: ProcessId = node.spawn(async move {
    let () = Process::receive::<()>().await;

    for _ in 0..3 {
      let label: String = Process::receive_match(vec![
        Match::when(|value: &u32| *value > 10, |value: u32| format!("big {value}")),
        Match::new(|value: u32| format!("small {value}")),
        Match::with_sender(|from: Option<ProcessId>, text: String| format!("{text} from {}", from.is_some())),
      ])
      .await;

      tx.send(label).unwrap();
    }
  });

  node.send(pid, String::from("hello"));
  node.send(pid, 3_u32);
  node.send(pid, 30_u32);
  node.send(pid, ());

  assert_eq!(rx.next().await, "hello from false");
  assert_eq!(rx.next().await, "small 3");
  assert_eq!(rx.next().await, "big 30");

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_receive_timeout_zero_polls() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(Option<u32>, Option<u32>)>();

  node.spawn(async move {
    let empty: Option<u32> = Process::receive_timeout(Duration::ZERO).await;

    Process::send(Process::this(), 9_u32);

    let full: Option<u32> = Process::receive_timeout(Duration::ZERO).await;

    tx.send((empty, full)).unwrap();
  });

  assert_eq!(rx.next().await, (None, Some(9)));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_receive_any_reports_sender() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(bool, bool)>();

  let sink: ProcessId = node.spawn(async move {
    let envelope: Envelope = Process::receive_any().await;
    let from: Option<ProcessId> = envelope.from();
    let sent: bool = envelope.downcast::<u64>().is_ok_and(|value| value == 5);

    tx.send((from.is_some(), sent)).unwrap();
  });

  node.spawn(async move {
    Process::send(sink, 5_u64);
  });

  assert_eq!(rx.next().await, (true, true));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_echo_reply_within_timeout() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Option<String>>();

  let echo: ProcessId = node.spawn(async {
    let (from, text): (ProcessId, String) = Process::receive().await;
    Process::send(from, text);
  });

  node.spawn(async move {
    Process::send(echo, (Process::this(), String::from("ping")));
    tx.send(Process::receive_timeout(Duration::from_secs(1)).await).unwrap();
  });

  assert_eq!(rx.next().await.as_deref(), Some("ping"));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_sees_die_once() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(bool, Option<String>, bool, bool)>();

  node.spawn(async move {
    let target: ProcessId = Process::spawn(async {
      let () = Process::receive::<()>().await;
      Process::die::<()>("boom").await;
    });

    Process::monitor(target);
    Process::send(target, ());

    let down: DownMessage = Process::receive().await;
    let again: Option<DownMessage> = Process::receive_timeout(Duration::from_millis(50)).await;

    tx.send((
      down.item() == target,
      down.info().reason::<String>(),
      again.is_none(),
      Process::alive(Process::this()),
    ))
    .unwrap();
  });

  assert_eq!(rx.next().await, (true, Some(String::from("boom")), true, true));

  node.shutdown().await;
}

// -----------------------------------------------------------------------------
// Exits
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_send_to_dead_pid_is_silent() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<bool>();

  node.spawn(async move {
    let (pid, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async {});
    let down: DownMessage = Process::receive().await;

    Process::send(pid, 1_u32);
    Process::send_named("nobody", 2_u32);

    tx.send(down.info().is_normal() && !Process::alive(pid)).unwrap();
  });

  assert!(rx.next().await);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_trap_exit_converts_signal() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(Option<ProcessId>, Option<String>)>();

  let config: SpawnConfig = SpawnConfig {
    trap_exit: true,
    ..SpawnConfig::new()
  };

  let trapper: ProcessId = node
    .spawn_opt(
      async move {
        let message: ExitMessage = Process::receive().await;
        tx.send((message.from(), message.exit().reason::<String>())).unwrap();
      },
      config,
    )
    .pid();

  let killer: ProcessId = node.spawn(async move {
    Process::exit(trapper, "shutdown");
    let () = Process::receive::<()>().await;
  });

  assert_eq!(rx.next().await, (Some(killer), Some(String::from("shutdown"))));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catch_exit_by_reason_type() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<String>();
  let (ready_tx, mut ready) = results::<()>();

  let pid: ProcessId = node.spawn(async move {
    let body = async move {
      ready_tx.send(()).unwrap();
      future_pending::<String>().await
    };

    let caught: String = Process::catch_exit(body, |_from, reason: String| async move {
      format!("caught {reason}")
    })
    .await;

    tx.send(caught).unwrap();
  });

  ready.next().await;
  node.exit(pid, "stop");

  assert_eq!(rx.next().await, "caught stop");

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catch_exit_ignores_other_reasons() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Option<String>>();
  let (pid_tx, mut pid_rx) = results::<ProcessId>();

  node.spawn(async move {
    let (_pid, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async move {
      let body = async move {
        pid_tx.send(Process::this()).unwrap();
        future_pending::<()>().await
      };

      Process::catch_exit(body, |_from, _reason: u32| async {}).await;
    });

    let down: DownMessage = Process::receive().await;
    tx.send(down.info().reason::<String>()).unwrap();
  });

  let pid: ProcessId = pid_rx.next().await;
  node.exit(pid, "not a number");

  assert_eq!(rx.next().await.as_deref(), Some("not a number"));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_nested_handlers_each_get_an_exit() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<String>();
  let (ready_tx, mut ready) = results::<()>();

  let inner_tx = tx.clone();

  let pid: ProcessId = node.spawn(async move {
    let body = async move {
      let inner = async move {
        ready_tx.send(()).unwrap();
        future_pending::<()>().await
      };

      Process::catch_exit(inner, |_from, reason: String| async move {
        inner_tx.send(format!("inner {reason}")).unwrap();
        future_pending::<()>().await
      })
      .await
    };

    Process::catch_exit(body, |_from, reason: String| async move {
      tx.send(format!("outer {reason}")).unwrap();
    })
    .await;
  });

  ready.next().await;
  node.exit(pid, "a");
  node.exit(pid, "b");

  assert_eq!(rx.next().await, "inner a");
  assert_eq!(rx.next().await, "outer b");
  assert!(rx.quiet(Duration::from_millis(50)).await);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropped_handler_passes_exit_outward() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<String>();
  let (ready_tx, mut ready) = results::<()>();

  let inner_tx = tx.clone();

  let pid: ProcessId = node.spawn(async move {
    let body = async move {
      let inner = async move {
        ready_tx.send(()).unwrap();
        future_pending::<()>().await
      };

      let handled = Process::catch_exit(inner, |_from, reason: String| async move {
        inner_tx.send(format!("inner {reason}")).unwrap();
      });

      tokio::select! {
        biased;
        () = Process::receive::<()>() => {}
        () = handled => {}
      }

      future_pending::<()>().await
    };

    Process::catch_exit(body, |_from, reason: String| async move {
      tx.send(format!("outer {reason}")).unwrap();
    })
    .await;
  });

  ready.next().await;
  node.send(pid, ());
  node.exit(pid, "a");

  assert_eq!(rx.next().await, "outer a");
  assert!(rx.quiet(Duration::from_millis(50)).await);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_message_before_exit_from_same_sender() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Vec<String>>();

  let config: SpawnConfig = SpawnConfig {
    trap_exit: true,
    ..SpawnConfig::new()
  };

  let trapper: ProcessId = node
    .spawn_opt(
      async move {
        let mut seen: Vec<String> = Vec::new();

        for _ in 0..4 {
          seen.push(describe(Process::receive_any().await));
        }

        tx.send(seen).unwrap();
      },
      config,
    )
    .pid();

  node.spawn(async move {
    for index in 1..=3 {
      Process::send(trapper, format!("m{index}"));
    }

    Process::exit(trapper, "bye");
  });

  assert_eq!(rx.next().await, ["m1", "m2", "m3", "exit bye"]);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_bypasses_handlers() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Exit>();
  let (pid_tx, mut pid_rx) = results::<ProcessId>();

  node.spawn(async move {
    let config: SpawnConfig = SpawnConfig {
      trap_exit: true,
      ..SpawnConfig::new_monitor()
    };

    let pid: ProcessId = Process::spawn_opt(
      async move {
        Process::catch_exit(future_pending(), |_from, _reason: Exit| async {}).await;
      },
      config,
    )
    .pid();

    pid_tx.send(pid).unwrap();

    let down: DownMessage = Process::receive().await;
    tx.send(down.info().clone()).unwrap();
  });

  let pid: ProcessId = pid_rx.next().await;
  node.kill(pid, Exit::Killed);

  assert!(rx.next().await.is_killed());

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panic_becomes_exit_reason() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Option<String>>();

  node.spawn(async move {
    Process::spawn_monitor(async {
      panic!("boom");
    });

    let down: DownMessage = Process::receive().await;
    tx.send(down.info().reason::<String>()).unwrap();
  });

  assert_eq!(rx.next().await.as_deref(), Some("boom"));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_die_terminates_with_reason() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Option<String>>();

  node.spawn(async move {
    Process::spawn_monitor(async {
      Process::die::<()>("done").await;
    });

    let down: DownMessage = Process::receive().await;
    tx.send(down.info().reason::<String>()).unwrap();
  });

  assert_eq!(rx.next().await.as_deref(), Some("done"));

  node.shutdown().await;
}

// -----------------------------------------------------------------------------
// Links & Monitors
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_opt_returns_monitor_handle() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(bool, bool, bool)>();

  node.spawn(async move {
    let plain: SpawnHandle = Process::spawn_opt(async {}, SpawnConfig::new());
    let watched: SpawnHandle = Process::spawn_opt(async {}, SpawnConfig::new_monitor());

    let SpawnHandle::Monitor(pid, mref) = watched else {
      panic!("expected a monitor handle");
    };

    let down: DownMessage = Process::receive().await;

    tx.send((
      plain.is_process() && !plain.is_monitor(),
      watched.is_monitor() && !watched.is_process(),
      down.mref() == mref && down.item() == pid && down.info().is_normal(),
    ))
    .unwrap();
  });

  assert_eq!(rx.next().await, (true, true, true));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_dead_pid_reports_noproc() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(bool, bool)>();

  node.spawn(async move {
    let (pid, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async {});
    let _down: DownMessage = Process::receive().await;

    let mref: MonitorRef = Process::monitor(pid);
    let down: DownMessage = Process::receive().await;

    tx.send((down.mref() == mref, down.info().is_noproc())).unwrap();
  });

  assert_eq!(rx.next().await, (true, true));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_link_dead_pid_reports_noproc() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<bool>();

  node.spawn(async move {
    let (pid, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async {});
    let _down: DownMessage = Process::receive().await;

    Process::set_flag(ProcessFlags::TRAP_EXIT, true);
    Process::link(pid);

    let message: ExitMessage = Process::receive().await;
    tx.send(message.from() == Some(pid) && message.exit().is_noproc()).unwrap();
  });

  assert!(rx.next().await);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_link_propagates_failure() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<Option<String>>();

  node.spawn(async move {
    Process::spawn_monitor(async {
      Process::spawn_link(async {
        Process::die::<()>("child failed").await;
      });

      future_pending::<()>().await;
    });

    let down: DownMessage = Process::receive().await;
    tx.send(down.info().reason::<String>()).unwrap();
  });

  assert_eq!(rx.next().await.as_deref(), Some("child failed"));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_links_are_one_way() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<bool>();
  let (child_tx, mut child_rx) = results::<ProcessId>();

  node.spawn(async move {
    let (parent, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async move {
      child_tx.send(Process::spawn_link(future_pending())).unwrap();
      Process::die::<()>("parent failed").await;
    });

    let _down: DownMessage = Process::receive().await;

    tx.send(!Process::alive(parent)).unwrap();
  });

  let child: ProcessId = child_rx.next().await;

  assert!(rx.next().await);

  tokio::time::sleep(Duration::from_millis(20)).await;

  // The parent linked to the child; its own exit does not reach the child.
  assert!(node.alive(child));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlink_stops_propagation() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<bool>();

  node.spawn(async move {
    let target: ProcessId = Process::spawn(async {
      let () = Process::receive::<()>().await;
      Process::die::<()>("gone").await;
    });

    Process::link(target);
    Process::unlink(target);

    let mref: MonitorRef = Process::monitor(target);

    Process::send(target, ());

    let down: DownMessage = Process::receive().await;
    Process::sleep(Duration::from_millis(20)).await;

    tx.send(down.mref() == mref).unwrap();
  });

  assert!(rx.next().await);

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_demonitor_suppresses_down() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(bool, Option<DownMessage>)>();

  node.spawn(async move {
    let target: ProcessId = Process::spawn(async {
      let () = Process::receive::<()>().await;
    });

    let mref: MonitorRef = Process::monitor(target);
    let removed: bool = Process::demonitor(mref);

    Process::send(target, ());

    let down: Option<DownMessage> = Process::receive_timeout(Duration::from_millis(100)).await;

    tx.send((removed, down)).unwrap();
  });

  assert_eq!(rx.next().await, (true, None));

  node.shutdown().await;
}

// -----------------------------------------------------------------------------
// Registry
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_registered_name_round_trip() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<u32>();

  node.spawn(async move {
    Process::register(Process::this(), "echo");

    let value: u32 = Process::receive().await;
    tx.send(value).unwrap();
  });

  while node.whereis("echo").is_none() {
    tokio::task::yield_now().await;
  }

  assert_eq!(node.registered(), vec![String::from("echo")]);

  node.send_named("echo", 11_u32);

  assert_eq!(rx.next().await, 11);

  while node.whereis("echo").is_some() {
    tokio::task::yield_now().await;
  }

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_taken_name_fails() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<(Option<ExceptionGroup>, bool)>();

  node.spawn(async move {
    Process::register(Process::this(), "taken");

    let (_pid, _mref): (ProcessId, MonitorRef) = Process::spawn_monitor(async {
      Process::register(Process::this(), "taken");
    });

    let down: DownMessage = Process::receive().await;

    let group: Option<ExceptionGroup> = down.info().reason::<Exception>().map(|error| error.group());

    tx.send((group, Process::whereis("taken") == Some(Process::this()))).unwrap();
  });

  assert_eq!(rx.next().await, (Some(ExceptionGroup::BadArg), true));

  node.shutdown().await;
}

// -----------------------------------------------------------------------------
// Info
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_info_reports_links_and_mailbox() {
  let node: Node = common::node().await;
  let (tx, mut rx) = results::<ProcessInfo>();

  node.spawn(async move {
    let target: ProcessId = Process::spawn(future_pending());

    Process::link(target);
    Process::send(target, 1_u8);
    Process::send(target, 2_u8);
    Process::sleep(Duration::from_millis(20)).await;

    match Process::info(target) {
      Some(info) => tx.send(info).unwrap(),
      None => panic!("target not alive"),
    }

    Process::unlink(target);
  });

  let info: ProcessInfo = rx.next().await;

  assert!(info.state.is_running());
  assert_eq!(info.mailbox_len, 2);
  assert_eq!(info.linked_by.len(), 1);
  assert!(info.links.is_empty());
  assert!(!info.flags.contains(ProcessFlags::TRAP_EXIT));

  node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_kills_everything() {
  let node: Node = common::node().await;

  for _ in 0..8 {
    node.spawn(future_pending());
  }

  assert_eq!(node.processes().len(), 8);

  assert!(tokio::time::timeout(common::WAIT, node.shutdown()).await.is_ok());

  assert!(node.is_shutdown());
  assert!(node.processes().is_empty());
}

async fn future_pending<T>() -> T {
  std::future::pending().await
}

/// Labels a message as its text or as the reason of an exit message.
fn describe(envelope: Envelope) -> String {
  match envelope.downcast::<String>() {
    Ok(text) => text,
    Err(envelope) => match envelope.downcast::<ExitMessage>() {
      Ok(message) => format!("exit {}", message.exit()),
      Err(envelope) => format!("{envelope:?}"),
    },
  }
}
