use std::thread;

use ark_io::push::pipe::bound_pair;
use ark_io::push::EventPump;
use ark_io::{
    copy, copy_with, Closer, CopyOptions, FixedBufferReader, GrowableBuffer,
    IoError, PushReader, PushWriter, Reader, Writer,
};
use rand::prelude::*;
use rstest::rstest;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

#[rstest]
#[case(1, 1000)]
#[case(7, 4096)]
#[case(64, 100_000)]
#[case(65536, 100_000)]
fn copy_through_pipe_on_explicit_pump(
    #[case] capacity: usize,
    #[case] size: usize,
) -> anyhow::Result<()> {
    init_logger();
    let pump = EventPump::start("push-e2e")?;
    let (input, output) = bound_pair(capacity);
    let mut reader = PushReader::with_pump(input, &pump)?;
    let mut writer = PushWriter::with_pump(output, &pump)?;

    let data = generate_random_data(size);
    let sent = data.clone();
    let producer = thread::spawn(move || -> anyhow::Result<u64> {
        let mut src = FixedBufferReader::new(&sent);
        let copied = copy_with(
            &mut writer,
            &mut src,
            &CopyOptions {
                chunk_size: 333,
                limit: None,
            },
        )?;
        writer.close()?;
        Ok(copied)
    });

    let mut sink = GrowableBuffer::new();
    let received = copy(&mut sink, &mut reader)?;
    assert_eq!(producer.join().expect("producer panicked")?, size as u64);
    assert_eq!(received, size as u64);
    assert_eq!(sink.into_inner(), data);

    reader.close()?;
    assert_eq!(pump.registered(), 0);
    Ok(())
}

#[test]
fn global_pump_serves_many_pipes() -> anyhow::Result<()> {
    init_logger();
    let workers: Vec<_> = (0..4u8)
        .map(|tag| {
            thread::spawn(move || -> anyhow::Result<Vec<u8>> {
                let (input, output) = bound_pair(16);
                let mut reader = PushReader::new(input)?;
                let mut writer = PushWriter::new(output)?;

                let producer = thread::spawn(move || -> ark_io::Result<()> {
                    for _ in 0..100 {
                        writer.write(&[tag; 10])?;
                    }
                    writer.close()
                });

                let mut received = Vec::new();
                reader.read_to_end(&mut received)?;
                producer.join().expect("producer panicked")?;
                Ok(received)
            })
        })
        .collect();

    for (tag, worker) in workers.into_iter().enumerate() {
        let received = worker.join().expect("worker panicked")?;
        assert_eq!(received, vec![tag as u8; 1000]);
    }
    Ok(())
}

#[test]
fn producer_sees_broken_pipe_when_consumer_leaves() -> anyhow::Result<()> {
    init_logger();
    let pump = EventPump::start("push-broken")?;
    let (input, output) = bound_pair(4);
    let mut reader = PushReader::with_pump(input, &pump)?;
    let mut writer = PushWriter::with_pump(output, &pump)?;

    let mut first = [0u8; 2];
    let producer = thread::spawn(move || writer.write(&[1u8; 64]));
    reader.read(&mut first)?;
    drop(reader);

    match producer.join().expect("producer panicked") {
        Err(IoError::ShortWrite {
            written,
            expected,
            reason,
        }) => {
            assert!(written >= 2 && written < 64);
            assert_eq!(expected, 64);
            assert!(
                matches!(reason.as_deref(), Some(IoError::Unknown { .. })),
                "broken pipe reason missing: {reason:?}"
            );
        }
        other => panic!("expected a short write, got {other:?}"),
    }
    Ok(())
}
