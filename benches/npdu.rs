use std::sync::Arc;

use bacnet_device::app::ApplicationHandler;
use bacnet_device::network::{self, Address, NetworkPriority, NpduHeader};
use bacnet_device::object::analog::AnalogObjects;
use bacnet_device::object::device::{DeviceConfig, DeviceObject};
use bacnet_device::object::{ObjectRegistry, PropertyDispatcher};
use bacnet_device::storage::MemoryKeyValueStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn encode_benchmark(c: &mut Criterion) {
    let destination = Address::remote(0x0102, &[0xAA, 0xBB, 0xCC, 0xDD, 0xBA, 0xC0]).unwrap();
    let source = Address::remote(0x0304, &[0x11]).unwrap();
    let header = NpduHeader::for_apdu(true, NetworkPriority::Normal);
    let mut buffer = Vec::with_capacity(network::MAX_NPDU_HEADER_LEN);

    c.bench_function("npdu_encode_routed", |b| {
        b.iter(|| {
            buffer.clear();
            network::encode(
                &mut buffer,
                Some(black_box(&destination)),
                Some(black_box(&source)),
                &header,
            )
        })
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let frame = [
        0x01, 0x2C, 0x01, 0x02, 0x06, 0xAA, 0xBB, 0xCC, 0xDD, 0xBA, 0xC0, 0x03, 0x04, 0x01, 0x11,
        0xFF, 0x00, 0x05, 0x01, 0x0C,
    ];
    c.bench_function("npdu_decode_routed", |b| {
        b.iter(|| network::decode(black_box(&frame)))
    });
}

fn read_property_benchmark(c: &mut Criterion) {
    let device = Arc::new(DeviceObject::new(
        DeviceConfig::default(),
        Arc::new(MemoryKeyValueStore::new()),
    ));
    let registry = ObjectRegistry::builder()
        .with_device(device.clone())
        .add_object(Arc::new(AnalogObjects::inputs(64)))
        .build()
        .unwrap();
    registry.init_all().unwrap();
    let handler = ApplicationHandler::new(PropertyDispatcher::new(Arc::new(registry)), device);

    // ReadProperty analog-input,63 present-value
    let frame = [
        0x01, 0x04, 0x00, 0x05, 0x01, 0x0C, 0x0C, 0x00, 0x00, 0x00, 0x3F, 0x19, 0x55,
    ];
    c.bench_function("read_property_frame", |b| {
        b.iter(|| handler.handle_frame(black_box(&frame)))
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark, read_property_benchmark);
criterion_main!(benches);
