use super::*;
use crate::error::Error;
use crate::graphics_device::GraphicsDevice;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::io::FrameInput;
use crate::effect::test_support::{Harness, ShaderDir};

fn particles(shaders: &ShaderDir, particle_count: u32) -> ParticleEffect {
    ParticleEffect::new(shaders.library(), ParticleSettings { particle_count, ..ParticleSettings::default() })
}

fn update(harness: &Harness, effect: &mut ParticleEffect, slot: usize) {
    let input = FrameInput { time: 1.0, delta_time: 0.016, ..FrameInput::default() };
    effect.update(&harness.ctx, &FrameUpdate { input: &input, slot }).unwrap();
}

/// Journal commands of the first command list that recorded `marker`
fn commands_around(device: &MockGraphicsDevice, marker: &str) -> Vec<String> {
    let entries = device.entries();
    let Some(hit) = entries.iter().find(|e| e.contains(marker)) else {
        return Vec::new();
    };
    let prefix = format!("{}:", hit.split(':').next().unwrap_or(""));
    entries
        .iter()
        .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

fn families(commands: &[String]) -> Vec<String> {
    commands
        .iter()
        .filter(|c| c.starts_with("buffer_barrier"))
        .filter_map(|c| c.split("family=").nth(1).map(str::to_string))
        .collect()
}

#[test]
fn test_setup_uploads_initial_particles() {
    let shaders = ShaderDir::new("particles_setup");
    let mut harness = Harness::new(320, 240);
    let mut effect = particles(&shaders, 1000);

    harness.setup(&mut effect).unwrap();
    assert_eq!(harness.device.count(":create 32000"), 1);
    assert_eq!(harness.device.count(":update 32000"), 1);
    assert_eq!(harness.device.count(":create graphics"), 1);
    assert_eq!(harness.device.count(":create compute"), 1);
    assert_eq!(harness.shutdown(&mut effect), 0);
}

#[test]
fn test_initial_particles_wait_for_emission() {
    let first = Particle::initial(0, 100.0);
    let later = Particle::initial(50, 100.0);
    assert_eq!(first.position[3], 0.0);
    assert_eq!(later.position[3], -0.5);
    assert!((0.0..1.0).contains(&later.velocity[3]));
    assert_eq!(std::mem::size_of::<Particle>(), 32);
    assert_eq!(std::mem::size_of::<SimulationParams>(), 32);
}

#[test]
fn test_compute_records_transfer_pair_around_dispatch() {
    let shaders = ShaderDir::new("particles_compute");
    let mut harness = Harness::new(320, 240);
    let mut effect = particles(&shaders, 16384);
    harness.setup(&mut effect).unwrap();
    update(&harness, &mut effect, 0);
    harness.device.clear_journal();

    assert!(harness.compute(&mut effect));

    let commands = commands_around(&harness.device, ":dispatch");
    let dispatch = commands.iter().position(|c| c == "dispatch 64 1 1").unwrap();
    let barriers: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with("buffer_barrier"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(barriers.len(), 2);
    assert!(barriers[0] < dispatch && dispatch < barriers[1]);
    assert_eq!(families(&commands), vec!["0->1", "1->0"]);
    harness.shutdown(&mut effect);
}

#[test]
fn test_graphics_acquire_and_release_match_compute() {
    let shaders = ShaderDir::new("particles_graphics");
    let mut harness = Harness::new(320, 240);
    let mut effect = particles(&shaders, 4096);
    harness.setup(&mut effect).unwrap();
    harness.device.clear_journal();

    assert_eq!(harness.frame(&mut effect, 0), (1, 0));

    let commands = commands_around(&harness.device, ":draw 4096");
    let draw = commands.iter().position(|c| c == "draw 4096").unwrap();
    let barriers: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with("buffer_barrier"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(barriers.len(), 2);
    assert!(barriers[0] < draw && draw < barriers[1]);
    // acquire mirrors the compute release, release mirrors the compute acquire
    assert_eq!(families(&commands), vec!["1->0", "0->1"]);
    assert!(commands[barriers[0]].contains("stage=COMPUTE_SHADER->VERTEX_INPUT"));
    harness.shutdown(&mut effect);
}

#[test]
fn test_shared_family_skips_graphics_barriers() {
    let shaders = ShaderDir::new("particles_shared");
    let mut harness = Harness::on(Arc::new(MockGraphicsDevice::with_shared_queue()), 320, 240);
    let mut effect = particles(&shaders, 256);
    harness.setup(&mut effect).unwrap();
    harness.device.clear_journal();

    harness.frame(&mut effect, 0);
    assert_eq!(harness.device.count("buffer_barrier"), 0);

    harness.compute(&mut effect);
    let commands = commands_around(&harness.device, ":dispatch");
    assert_eq!(families(&commands), vec!["ignored->ignored", "ignored->ignored"]);
    assert!(commands.contains(&"dispatch 1 1 1".to_string()));
    harness.shutdown(&mut effect);
}

#[test]
fn test_record_before_setup_fails() {
    let shaders = ShaderDir::new("particles_no_setup");
    let harness = Harness::new(64, 64);
    let mut effect = particles(&shaders, 64);
    let input = FrameInput::default();

    assert!(effect.update(&harness.ctx, &FrameUpdate { input: &input, slot: 0 }).is_err());
    let mut cmd = harness.device.create_command_list(crate::graphics_device::QueueType::Compute).unwrap();
    assert!(effect.record_compute(&harness.ctx, cmd.as_mut()).is_err());
}

#[test]
fn test_simulation_block_per_slot() {
    let shaders = ShaderDir::new("particles_slots");
    let mut harness = Harness::new(64, 64);
    let mut effect = particles(&shaders, 512);
    harness.setup(&mut effect).unwrap();

    for slot in [0, 1, 0, 1] {
        update(&harness, &mut effect, slot);
    }
    assert_eq!(harness.device.count("create set=0 resources=2"), 2);
    assert_eq!(harness.device.count("create set=0 resources=1"), 2);
    harness.shutdown(&mut effect);
}

#[test]
fn test_emission_parameters() {
    let shaders = ShaderDir::new("particles_params");
    let mut harness = Harness::new(64, 64);
    let mut effect = particles(&shaders, 512);
    harness.setup(&mut effect).unwrap();

    let kind = effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("emission_rate", 1000.0f32)).unwrap();
    assert_eq!(kind, RebuildKind::Parameters);
    effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("lifetime", 2u32)).unwrap();
    assert_eq!(effect.settings().emission_rate, 1000.0);
    assert_eq!(effect.settings().lifetime, 2.0);

    let result = effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("lifetime", 0.0f32));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("particle_count", 8u32)).is_err());
    assert_eq!(effect.settings().lifetime, 2.0);
    harness.shutdown(&mut effect);
}

#[test]
fn test_resize_keeps_particles() {
    let shaders = ShaderDir::new("particles_resize");
    let mut harness = Harness::new(64, 64);
    let mut effect = particles(&shaders, 512);
    harness.setup(&mut effect).unwrap();
    harness.device.clear_journal();

    harness.resize(&mut effect, 128, 128).unwrap();
    let buffers = harness.device.entries().iter().filter(|e| e.starts_with("buffer#")).count();
    assert_eq!(buffers, 0);
    assert_eq!(harness.frame(&mut effect, 0), (1, 0));
    harness.shutdown(&mut effect);
}
