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

use prism_core::renderer::api::MemoryVisibility;
use prism_core::testing::MockGraphicsDevice;
use prism_data::ubo::{ModelUboConfiguration, UboPool, UboPoolConfig};
use std::sync::Arc;

fn pool() -> UboPool<ModelUboConfiguration> {
    let _ = env_logger::builder().is_test(true).try_init();
    UboPool::with_config(
        Arc::new(MockGraphicsDevice::new()),
        "Model",
        UboPoolConfig {
            chunk_elements: 4,
            ..Default::default()
        },
    )
}

#[test]
fn get_then_put_restores_the_allocation_count() -> anyhow::Result<()> {
    let mut pool = pool();
    let kept = pool.get_buffer(MemoryVisibility::HostVisible)?;
    let before = pool.allocated_count();

    let handle = pool.get_buffer(MemoryVisibility::HostVisible)?;
    pool.put_buffer(handle);

    assert_eq!(pool.allocated_count(), before);
    assert!(pool.is_valid(&kept));
    Ok(())
}

#[test]
fn alternating_get_and_put_does_not_grow() -> anyhow::Result<()> {
    let mut pool = pool();
    for _ in 0..1_000 {
        let batch: Vec<_> = (0..3)
            .map(|_| pool.get_buffer(MemoryVisibility::HostVisible))
            .collect::<Result<_, _>>()?;
        for handle in batch {
            pool.put_buffer(handle);
        }
    }
    assert_eq!(pool.chunk_count(), 1);
    assert_eq!(pool.capacity(), 4);
    assert_eq!(pool.allocated_count(), 0);
    Ok(())
}

#[test]
fn reacquired_slots_start_zeroed() -> anyhow::Result<()> {
    let mut pool = pool();
    let handle = pool.get_buffer(MemoryVisibility::HostVisible)?;
    pool.data_mut(&handle).material_index = 12;
    pool.put_buffer(handle);

    let again = pool.get_buffer(MemoryVisibility::HostVisible)?;
    assert_eq!(again.index(), handle.index());
    assert_eq!(pool.data(&again).material_index, 0);
    Ok(())
}

#[test]
#[should_panic(expected = "stale UBO handle")]
fn stale_handles_cannot_read() {
    let mut pool = pool();
    let handle = pool
        .get_buffer(MemoryVisibility::HostVisible)
        .expect("first chunk");
    pool.put_buffer(handle);
    let _ = pool.data(&handle);
}
