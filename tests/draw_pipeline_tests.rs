//! Draw Pipeline Tests
//!
//! Tests for:
//! - Scene::compile packing into shared buffers (offsets, base vertex, alignment)
//! - Allocation failure surfacing from compile
//! - Draw list construction: visibility, ordering, matrices
//! - Material sort: grouping, permutation, stability
//! - Render pass sequence, program switching and per-light submission
//! - Light buffer strategy
//! - Render-time errors: missing shader, missing compile

use glam::{Mat4, Vec2, Vec3};

use trellis::errors::SceneError;
use trellis::renderer::device::{BufferTarget, ClearFlags, PassState, ProgramId, UniformValue};
use trellis::renderer::frame::FramePhase;
use trellis::renderer::headless::{Command, HeadlessDevice};
use trellis::renderer::settings::{LightingStrategy, SceneSettings};
use trellis::renderer::shader_library::ShaderLibrary;
use trellis::resources::{Material, MaterialType, Mesh, Vertex};
use trellis::scene::{MeshKey, NodeHandle, PointLight, Scene};

const DIFFUSE: ProgramId = ProgramId(10);
const SPECULAR: ProgramId = ProgramId(11);
const EMISSIVE: ProgramId = ProgramId(12);
const DEPTH: ProgramId = ProgramId(13);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shaders() -> ShaderLibrary {
    ShaderLibrary::new()
        .with(MaterialType::Diffuse, DIFFUSE)
        .with(MaterialType::Specular, SPECULAR)
        .with(MaterialType::Emissive, EMISSIVE)
        .with(MaterialType::DepthOnly, DEPTH)
}

fn triangle(name: &str, kind: MaterialType) -> Mesh {
    let vertices = vec![
        Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
        Vertex::new(Vec3::X, Vec3::Z, Vec2::X),
        Vertex::new(Vec3::Y, Vec3::Z, Vec2::Y),
    ];
    Mesh::new(name, vertices, vec![0, 1, 2], Material::new(kind))
}

struct Fixture {
    scene: Scene,
    specular: MeshKey,
    diffuse: MeshKey,
    nodes: Vec<NodeHandle>,
}

/// Three mesh nodes in walk order: Specular, Diffuse, Diffuse.
fn fixture(settings: SceneSettings) -> Fixture {
    let mut scene = Scene::with_settings("pipeline", settings);
    let specular = scene.add_mesh(Mesh::cube("Cube", Material::new(MaterialType::Specular)));
    let diffuse = scene.add_mesh(triangle("Tri", MaterialType::Diffuse));

    let a = scene.build_node("A").with_position(1.0, 0.0, 0.0).with_mesh(specular).build();
    let b = scene.build_node("B").with_position(0.0, 1.0, 0.0).with_mesh(diffuse).build();
    let c = scene.build_node("C").with_position(0.0, 0.0, -1.0).with_mesh(diffuse).build();

    Fixture {
        scene,
        specular,
        diffuse,
        nodes: vec![a, b, c],
    }
}

fn add_lights(scene: &mut Scene, count: usize) {
    for i in 0..count {
        scene
            .build_node(&format!("Lamp{i}"))
            .with_position(i as f32, 5.0, 0.0)
            .with_light(PointLight::new(format!("lamp{i}"), Vec3::ONE, Vec3::ONE))
            .build();
    }
}

fn pass_states(device: &HeadlessDevice) -> Vec<PassState> {
    device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetPassState(s) => Some(*s),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Compile
// ============================================================================

#[test]
fn compile_packs_meshes_into_shared_buffers() {
    init_logger();
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let geometry = f.scene.geometry().unwrap();
    let cube = *geometry.range(f.specular).unwrap();
    let tri = *geometry.range(f.diffuse).unwrap();

    assert_eq!(cube.vertex_offset, 0);
    assert_eq!(cube.index_offset, 0);
    assert_eq!(cube.base_vertex, 0);
    assert_eq!(cube.index_count, 36);

    // 24 vertices * 64 bytes; 72 index bytes padded to 80
    assert_eq!(tri.vertex_offset, 1536);
    assert_eq!(tri.base_vertex, 24);
    assert_eq!(tri.index_offset, 80);
    assert_eq!(tri.index_count, 3);

    assert_eq!(geometry.vertex_bytes(), 27 * 64);
    assert_eq!(geometry.index_bytes(), 96);
}

#[test]
fn compile_uploads_index_runs_at_recorded_offsets() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let index_buffer = device
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::CreateBuffer { id, target: BufferTarget::Index, .. } => Some(*id),
            _ => None,
        })
        .unwrap();
    let data = device.buffer_data(index_buffer).unwrap();
    let tri: Vec<u16> = data[80..86]
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(tri, vec![0, 1, 2]);
}

#[test]
fn recompile_releases_previous_buffers() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    f.scene.compile(&mut device).unwrap();
    f.scene.compile(&mut device).unwrap();
    assert_eq!(device.live_buffers(), 2);
    assert_eq!(device.live_vertex_arrays(), 1);

    f.scene.release(&mut device);
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.live_vertex_arrays(), 0);
    assert!(!f.scene.is_compiled());
}

#[test]
fn compile_fails_when_device_allocates_too_little() {
    init_logger();
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::with_buffer_limit(128);

    let err = f.scene.compile(&mut device).unwrap_err();
    assert!(matches!(
        err,
        SceneError::BufferAllocation {
            target: BufferTarget::Vertex,
            required: 1728,
            allocated: 128
        }
    ));
    assert!(!f.scene.is_compiled());
    assert_eq!(device.live_buffers(), 0);
}

// ============================================================================
// Draw list
// ============================================================================

#[test]
fn draw_list_sort_groups_materials_and_is_a_permutation() {
    let mut f = fixture(SceneSettings::default());
    let emissive = f.scene.add_mesh(triangle("Glow", MaterialType::Emissive));
    let d = f.scene.build_node("D").with_mesh(emissive).build();
    f.scene.attach_mesh(d, f.specular);

    let mut before: Vec<_> = f.scene.build_draw_list().iter().map(|e| (e.node, e.mesh)).collect();
    assert_eq!(before.len(), 5);

    f.scene.sort_draw_list();
    let list = f.scene.draw_list();
    assert!(list.is_sorted_by_material());
    assert_eq!(list.len(), 5);

    let mut after: Vec<_> = list.iter().map(|e| (e.node, e.mesh)).collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
}

#[test]
fn draw_list_sort_is_stable() {
    let mut f = fixture(SceneSettings::default());
    f.scene.build_draw_list();
    f.scene.sort_draw_list();

    let order: Vec<_> = f.scene.draw_list().iter().map(|e| e.node).collect();
    // Diffuse B and C keep their walk order, Specular A follows
    assert_eq!(order, vec![f.nodes[1], f.nodes[2], f.nodes[0]]);
    assert_eq!(f.scene.draw_list().material_switches(), 2);
}

#[test]
fn invisible_node_hides_entire_subtree() {
    let mut f = fixture(SceneSettings::default());
    let group = f.scene.create_node("Group", f.scene.root());
    let mut inner = group;
    for i in 0..3 {
        inner = f.scene.build_node(&format!("Inner{i}")).with_parent(inner).with_mesh(f.diffuse).build();
    }
    assert_eq!(f.scene.build_draw_list().len(), 6);

    f.scene.set_visible(group, false);
    let list = f.scene.build_draw_list();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|e| f.nodes.contains(&e.node)));
}

#[test]
fn children_are_appended_before_their_parent() {
    let mut scene = Scene::new("order");
    let mesh = scene.add_mesh(triangle("Tri", MaterialType::Diffuse));
    let parent = scene.build_node("Parent").with_mesh(mesh).build();
    let child = scene.build_node("Child").with_parent(parent).with_mesh(mesh).build();

    let order: Vec<_> = scene.build_draw_list().iter().map(|e| e.node).collect();
    assert_eq!(order, vec![child, parent]);
}

#[test]
fn draw_entries_carry_current_frame_matrices() {
    let mut scene = Scene::new("matrices");
    let mesh = scene.add_mesh(triangle("Tri", MaterialType::Specular));
    let parent = scene.build_node("Parent").with_position(0.0, 0.0, -3.0).build();
    let child = scene
        .build_node("Child")
        .with_parent(parent)
        .with_position(1.0, 0.0, 0.0)
        .with_scale(2.0)
        .with_mesh(mesh)
        .build();
    scene.camera.set_look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);

    let list = scene.build_draw_list();
    let entry = list.entries()[0];
    assert_eq!(entry.node, child);
    assert_eq!(entry.material, MaterialType::Specular);

    let expected_model = Mat4::from_translation(Vec3::new(1.0, 0.0, -3.0)) * Mat4::from_scale(Vec3::splat(2.0));
    assert!(entry.model.abs_diff_eq(expected_model, 1e-5));
    assert!(entry.mvp.abs_diff_eq(*scene.camera.view_projection_matrix() * expected_model, 1e-4));
    // Uniform scale 2: inverse-transpose is scale 1/2
    assert!((entry.normal.x_axis.x - 0.5).abs() < 1e-5);
}

#[test]
fn draw_list_reflects_transform_changes_made_this_frame() {
    let mut f = fixture(SceneSettings::default());
    f.scene.build_draw_list();

    f.scene.set_local_transform(f.nodes[0], Some(Vec3::new(9.0, 0.0, 0.0)), None, None);
    let list = f.scene.build_draw_list();
    let entry = list.iter().find(|e| e.node == f.nodes[0]).unwrap();
    assert!((entry.model.w_axis.x - 9.0).abs() < 1e-6);
}

// ============================================================================
// Render passes (per-light forward)
// ============================================================================

#[test]
fn render_runs_depth_ambient_then_one_pass_per_light() {
    init_logger();
    let mut f = fixture(SceneSettings::default());
    add_lights(&mut f.scene, 2);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();

    let stats = f.scene.render(&mut device, &shaders()).unwrap();

    assert_eq!(
        pass_states(&device),
        vec![
            PassState::DEPTH_PREPASS,
            PassState::AMBIENT,
            PassState::ADDITIVE_LIGHT,
            PassState::ADDITIVE_LIGHT
        ]
    );
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.lights, 2);
    assert_eq!(stats.passes, 4);
    // depth + ambient + one submission per light
    assert_eq!(stats.draw_calls, 3 + 3 + 2 * 3);
    assert_eq!(device.draw_calls().count(), 12);
    assert_eq!(
        stats.phases.as_slice(),
        &[
            FramePhase::BuildDrawList,
            FramePhase::SortDrawList,
            FramePhase::DepthPrePass,
            FramePhase::AmbientPass,
            FramePhase::LightPass,
            FramePhase::LightPass,
            FramePhase::Idle,
        ]
    );
    assert_eq!(f.scene.phase(), FramePhase::Idle);
}

#[test]
fn render_clears_depth_then_color() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    f.scene.render(&mut device, &shaders()).unwrap();

    let clears: Vec<_> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::Clear(flags) => Some(*flags),
            _ => None,
        })
        .collect();
    assert_eq!(clears, vec![ClearFlags::DEPTH, ClearFlags::COLOR]);
}

#[test]
fn programs_rebind_only_on_material_change() {
    let mut f = fixture(SceneSettings::default());
    add_lights(&mut f.scene, 2);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();

    let stats = f.scene.render(&mut device, &shaders()).unwrap();

    let programs: Vec<_> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::UseProgram(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(
        programs,
        vec![DEPTH, DIFFUSE, SPECULAR, DIFFUSE, SPECULAR, DIFFUSE, SPECULAR]
    );
    assert_eq!(stats.program_binds, 7);
}

#[test]
fn depth_prepass_forces_depth_program() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();
    f.scene.render(&mut device, &shaders()).unwrap();

    let commands = device.commands();
    let ambient_start = commands
        .iter()
        .position(|c| *c == Command::SetPassState(PassState::AMBIENT))
        .unwrap();
    let depth_pass = &commands[..ambient_start];
    assert!(depth_pass.iter().all(|c| match c {
        Command::UseProgram(p) => *p == DEPTH,
        _ => true,
    }));
    assert_eq!(depth_pass.iter().filter(|c| matches!(c, Command::DrawIndexed { .. })).count(), 3);
}

#[test]
fn draws_use_recorded_offsets_and_base_vertex() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();
    f.scene.render(&mut device, &shaders()).unwrap();

    let first_three: Vec<_> = device.draw_calls().take(3).cloned().collect();
    assert_eq!(
        first_three,
        vec![
            Command::DrawIndexed { count: 3, index_offset: 80, base_vertex: 24 },
            Command::DrawIndexed { count: 3, index_offset: 80, base_vertex: 24 },
            Command::DrawIndexed { count: 36, index_offset: 0, base_vertex: 0 },
        ]
    );
}

#[test]
fn light_pass_uploads_light_uniforms_per_light() {
    let mut f = fixture(SceneSettings::default());
    add_lights(&mut f.scene, 2);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();
    f.scene.render(&mut device, &shaders()).unwrap();

    let positions: Vec<_> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetUniform { name, value: UniformValue::Vec3(v), .. } if name == "light.position" => Some(*v),
            _ => None,
        })
        .collect();

    // Ambient pass: zeroed light for each of the two programs; then each light
    // pass sets its light once per program switch.
    assert_eq!(
        positions,
        vec![
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(1.0, 5.0, 0.0),
            Vec3::new(1.0, 5.0, 0.0),
        ]
    );
}

#[test]
fn ambient_pass_zeroes_diffuse_and_specular() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();
    f.scene.render(&mut device, &shaders()).unwrap();

    let commands = device.commands();
    let ambient_start = commands
        .iter()
        .position(|c| *c == Command::SetPassState(PassState::AMBIENT))
        .unwrap();
    let diffuse_terms: Vec<_> = commands[ambient_start..]
        .iter()
        .filter_map(|c| match c {
            Command::SetUniform { name, value, .. } if name == "material.diffuse" => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(diffuse_terms.len(), 3);
    assert!(diffuse_terms.iter().all(|v| *v == UniformValue::Vec3(Vec3::ZERO)));
}

#[test]
fn render_without_lights_runs_two_passes() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    let stats = f.scene.render(&mut device, &shaders()).unwrap();
    assert_eq!(stats.passes, 2);
    assert_eq!(stats.draw_calls, 6);
}

#[test]
fn hidden_light_is_not_rendered() {
    let mut f = fixture(SceneSettings::default());
    add_lights(&mut f.scene, 2);
    let lamp = f.scene.node_by_name("Lamp1").unwrap();
    f.scene.set_visible(lamp, false);

    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    let stats = f.scene.render(&mut device, &shaders()).unwrap();
    assert_eq!(stats.lights, 1);
    assert_eq!(stats.passes, 3);
}

// ============================================================================
// Render passes (light buffer)
// ============================================================================

#[test]
fn light_buffer_strategy_submits_once() {
    init_logger();
    let settings = SceneSettings {
        lighting: LightingStrategy::LightBuffer { capacity: 8 },
        ..Default::default()
    };
    let mut f = fixture(settings);
    add_lights(&mut f.scene, 3);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();
    device.take_commands();

    let stats = f.scene.render(&mut device, &shaders()).unwrap();

    assert_eq!(stats.passes, 3);
    assert_eq!(stats.lights, 3);
    assert_eq!(stats.draw_calls, 9);
    assert_eq!(
        pass_states(&device),
        vec![PassState::DEPTH_PREPASS, PassState::AMBIENT, PassState::ADDITIVE_LIGHT]
    );

    let commands = device.commands();
    assert!(commands.iter().any(|c| matches!(c, Command::BindBufferBase { binding: 1, .. })));
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::SetUniform { name, value: UniformValue::I32(3), .. } if name == "lightCount"
    )));
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::BindUniformBlock { block, binding: 1, .. } if block == "LightBlock"
    )));
}

#[test]
fn light_buffer_drops_lights_over_capacity() {
    let settings = SceneSettings {
        lighting: LightingStrategy::LightBuffer { capacity: 2 },
        ..Default::default()
    };
    let mut f = fixture(settings);
    add_lights(&mut f.scene, 5);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let stats = f.scene.render(&mut device, &shaders()).unwrap();
    assert_eq!(stats.lights, 2);
    assert_eq!(f.scene.frame_lights().len(), 5);
}

#[test]
fn light_buffer_is_reused_across_frames() {
    let settings = SceneSettings {
        lighting: LightingStrategy::LightBuffer { capacity: 4 },
        ..Default::default()
    };
    let mut f = fixture(settings);
    add_lights(&mut f.scene, 1);
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    f.scene.render(&mut device, &shaders()).unwrap();
    f.scene.render(&mut device, &shaders()).unwrap();
    // vertex + index + one light block
    assert_eq!(device.live_buffers(), 3);
}

#[test]
fn light_buffer_allocation_failure_is_reported() {
    let settings = SceneSettings {
        lighting: LightingStrategy::LightBuffer { capacity: 100 },
        ..Default::default()
    };
    let mut scene = Scene::with_settings("small", settings);
    let mesh = scene.add_mesh(triangle("Tri", MaterialType::Diffuse));
    scene.build_node("T").with_mesh(mesh).build();
    let mut device = HeadlessDevice::with_buffer_limit(1024);
    scene.compile(&mut device).unwrap();

    let err = scene.render(&mut device, &shaders()).unwrap_err();
    assert!(matches!(
        err,
        SceneError::BufferAllocation { target: BufferTarget::Uniform, .. }
    ));
    assert_eq!(device.draw_calls().count(), 0);
}

#[test]
fn oversized_light_buffer_fails_before_drawing() {
    init_logger();
    let mut f = fixture(SceneSettings::default());
    add_lights(&mut f.scene, 2);
    f.scene.set_lighting_strategy(LightingStrategy::LightBuffer { capacity: usize::MAX });
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let err = f.scene.render(&mut device, &shaders()).unwrap_err();
    assert!(matches!(err, SceneError::LightCapacity { capacity: usize::MAX, .. }));
    assert_eq!(device.draw_calls().count(), 0);
    assert_eq!(f.scene.phase(), FramePhase::Idle);
}

// ============================================================================
// Render errors
// ============================================================================

#[test]
fn missing_material_shader_fails_before_drawing() {
    init_logger();
    let mut f = fixture(SceneSettings::default());
    let emissive = f.scene.add_mesh(triangle("Glow", MaterialType::Emissive));
    f.scene.build_node("Glow").with_mesh(emissive).build();
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let incomplete = ShaderLibrary::new()
        .with(MaterialType::Diffuse, DIFFUSE)
        .with(MaterialType::Specular, SPECULAR)
        .with(MaterialType::DepthOnly, DEPTH);
    let err = f.scene.render(&mut device, &incomplete).unwrap_err();

    assert!(matches!(err, SceneError::MissingShader(MaterialType::Emissive)));
    assert_eq!(device.draw_calls().count(), 0);
    assert_eq!(f.scene.phase(), FramePhase::Idle);
}

#[test]
fn missing_depth_shader_is_an_error() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let no_depth = ShaderLibrary::new()
        .with(MaterialType::Diffuse, DIFFUSE)
        .with(MaterialType::Specular, SPECULAR);
    let err = f.scene.render(&mut device, &no_depth).unwrap_err();
    assert!(matches!(err, SceneError::MissingShader(MaterialType::DepthOnly)));
}

#[test]
fn render_before_compile_is_an_error() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    let err = f.scene.render(&mut device, &shaders()).unwrap_err();
    assert!(matches!(err, SceneError::NotCompiled(name) if name == "pipeline"));
}

#[test]
fn mesh_added_after_compile_requires_recompile() {
    let mut f = fixture(SceneSettings::default());
    let mut device = HeadlessDevice::new();
    f.scene.compile(&mut device).unwrap();

    let late = f.scene.add_mesh(triangle("Late", MaterialType::Diffuse));
    f.scene.build_node("Late").with_mesh(late).build();
    assert!(matches!(
        f.scene.render(&mut device, &shaders()),
        Err(SceneError::NotCompiled(_))
    ));

    f.scene.compile(&mut device).unwrap();
    assert_eq!(f.scene.render(&mut device, &shaders()).unwrap().entries, 4);
}

#[test]
fn empty_scene_renders_nothing_without_compile() {
    let mut scene = Scene::new("empty");
    let mut device = HeadlessDevice::new();
    let stats = scene.render(&mut device, &ShaderLibrary::new()).unwrap();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.passes, 0);
    assert!(device.commands().is_empty());
}
