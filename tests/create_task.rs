use std::task::Poll;
use std::time::{Duration, Instant};

use anyhow::Result;

use SlotSwap::{CreateTask, EntityHandle, Host, MemoryHost};

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn existing_entity_settles_immediately() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.add_entity("Person#2", "Person");

    let now = Instant::now();
    let mut task = CreateTask::start(&mut host, "Person", "Person#2", TIMEOUT, now)?;
    assert!(task.is_settled());
    assert_eq!(task.poll(&host, now), Poll::Ready(EntityHandle::Ready(root)));
    Ok(())
}

#[test]
fn creation_completes_after_host_frames() -> Result<()> {
    let mut host = MemoryHost::new();
    host.set_create_delay(2);

    let now = Instant::now();
    let mut task = CreateTask::start(&mut host, "Person", "Person#3", TIMEOUT, now)?;
    assert_eq!(task.id(), "Person#3");

    let mut frames = 0;
    let handle = loop {
        if let Poll::Ready(h) = task.poll(&host, now) {
            break h;
        }
        host.tick();
        frames += 1;
        assert!(frames < 10, "creation never finished");
    };
    assert_eq!(frames, 3);
    let node = handle.node().expect("created");
    assert_eq!(host.resolve_entity("Person#3"), Some(node));
    assert_eq!(host.entity_name(node), Some("Person#3"));
    Ok(())
}

#[test]
fn refused_creation_times_out_to_void() -> Result<()> {
    let mut host = MemoryHost::new();
    host.refuse_type("Person");

    let start = Instant::now();
    let mut task = CreateTask::start(&mut host, "Person", "Ghost", TIMEOUT, start)?;
    host.tick();
    assert_eq!(task.poll(&host, start + Duration::from_secs(1)), Poll::Pending);

    let late = start + TIMEOUT;
    assert_eq!(task.poll(&host, late), Poll::Ready(EntityHandle::Void));
    assert!(task.is_settled());
    assert_eq!(EntityHandle::Void.node(), None);
    Ok(())
}
