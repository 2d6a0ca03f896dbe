// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use criterion::{criterion_group, criterion_main, Criterion};
use prism_core::renderer::api::MemoryVisibility;
use prism_core::testing::MockGraphicsDevice;
use prism_data::ubo::{ModelMatrixUboConfiguration, UboPool};
use std::hint::black_box;
use std::sync::Arc;

fn bench_pool(c: &mut Criterion) {
    let device = Arc::new(MockGraphicsDevice::new());
    let mut pool = UboPool::<ModelMatrixUboConfiguration>::new(device, "ModelMatrix");

    // Warm the pool so the loop measures reuse only.
    let warm: Vec<_> = (0..1_024)
        .map(|_| pool.get_buffer(MemoryVisibility::HostVisible).unwrap())
        .collect();
    for handle in warm {
        pool.put_buffer(handle);
    }

    let mut group = c.benchmark_group("UBO Pool");

    group.bench_function("get/put 1024 slots", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..1_024)
                .map(|_| pool.get_buffer(MemoryVisibility::HostVisible).unwrap())
                .collect();
            for handle in handles {
                black_box(pool.binding(&handle));
                pool.put_buffer(handle);
            }
        });
    });

    let handles: Vec<_> = (0..1_024)
        .map(|_| pool.get_buffer(MemoryVisibility::HostVisible).unwrap())
        .collect();
    group.bench_function("stage and upload 1024 matrices", |b| {
        b.iter(|| {
            for handle in &handles {
                pool.data_mut(handle).advance(Default::default());
            }
            pool.upload().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pool);
criterion_main!(benches);
