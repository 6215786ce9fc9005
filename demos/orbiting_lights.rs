//! Three point lights orbit a lit cube; each light carries a small emissive
//! indicator cube. Runs headless and logs what every frame submitted.
//!
//! `RUST_LOG=debug cargo run --example orbiting_lights`

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use trellis::animation::TrackData;
use trellis::renderer::device::ProgramId;
use trellis::{
    Animation, AnimationTrack, HeadlessDevice, Material, MaterialType, Mesh, PointLight, Scene,
    ShaderLibrary,
};

const FRAMES: usize = 240;
const DT: f32 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = Scene::new("orbiting_lights");
    scene.camera.set_look_at(Vec3::new(0.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y);

    let cube = scene.add_mesh(Mesh::cube(
        "Cube",
        Material::colored(MaterialType::Specular, Vec3::new(0.8, 0.3, 0.2)).with_specular(Vec3::ONE, 32.0),
    ));
    let floor = scene.add_mesh(Mesh::cube("Floor", Material::colored(MaterialType::Diffuse, Vec3::splat(0.6))));

    scene.build_node("Cube").with_mesh(cube).build();
    let floor_node = scene.build_node("Floor").with_position(0.0, -1.5, 0.0).with_mesh(floor).build();
    scene.set_local_transform(floor_node, None, None, Some(Vec3::new(8.0, 0.1, 8.0)));

    // One spin animation: 4 ticks per turn, 1 tick per second
    let mut spin = Animation::new("orbit", 4.0, 1.0);
    let colors = [Vec3::X, Vec3::Y, Vec3::Z];
    for (i, color) in colors.into_iter().enumerate() {
        let phase = i as f32 * TAU / 3.0;
        let pivot = scene
            .build_node(&format!("Pivot{i}"))
            .with_rotation(Quat::from_rotation_y(phase))
            .build();

        let indicator = scene
            .duplicate_mesh(cube, &format!("Indicator{i}"), Material::colored(MaterialType::Emissive, color))
            .ok_or_else(|| anyhow::anyhow!("cube mesh missing"))?;
        scene
            .build_node(&format!("Lamp{i}"))
            .with_parent(pivot)
            .with_position(3.0, 1.0, 0.0)
            .with_scale(0.2)
            .with_mesh(indicator)
            .with_light(PointLight::new(format!("lamp{i}"), color, Vec3::ONE))
            .build();

        let track = spin.add_track(AnimationTrack::rotation(
            format!("Pivot{i}.rotation"),
            pivot,
            scene.interpolation_mode(),
        ));
        if let TrackData::Rotation(keys) = &mut track.data {
            for step in 0..=4 {
                let angle = phase + step as f32 * TAU / 4.0;
                keys.insert(step as f32, Quat::from_rotation_y(angle));
            }
        }
    }
    scene.add_animation(spin);
    scene.set_default_light_radius(6.0);

    let shaders = ShaderLibrary::new()
        .with(MaterialType::Diffuse, ProgramId(1))
        .with(MaterialType::Specular, ProgramId(2))
        .with(MaterialType::Emissive, ProgramId(3))
        .with(MaterialType::DepthOnly, ProgramId(4));

    let mut device = HeadlessDevice::new();
    scene.compile(&mut device)?;

    let mut total_draws = 0;
    for frame in 0..FRAMES {
        scene.update_animation(DT);
        device.take_commands();
        let stats = scene.render(&mut device, &shaders)?;
        total_draws += stats.draw_calls;

        if frame % 60 == 0 {
            let lamp = scene
                .frame_lights()
                .first()
                .map_or(Vec3::ZERO, |light| light.position);
            log::info!(
                "frame {frame}: {} entries, {} lights, {} draws, {} program binds, lamp0 at {lamp:.2}",
                stats.entries,
                stats.lights,
                stats.draw_calls,
                stats.program_binds
            );
        }
    }

    log::info!("{FRAMES} frames, {total_draws} draw calls");
    scene.release(&mut device);
    Ok(())
}
