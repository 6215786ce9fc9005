//! Scene Tests
//!
//! Tests for:
//! - Node lookup by name and depth-first walk order
//! - Mesh registry: add, duplicate, lookup, attachment
//! - Point lights: attachment, default attenuation radius, discovery walk
//! - NodeBuilder
//! - Settings

use glam::Vec3;

use trellis::renderer::settings::{LightingStrategy, SceneSettings};
use trellis::resources::{Material, MaterialType, Mesh};
use trellis::scene::{Attenuation, PointLight, RenderableKind, Scene};

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn white_light(name: &str) -> PointLight {
    PointLight::new(name, Vec3::ONE, Vec3::ONE)
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn node_by_name_is_depth_first() {
    let mut scene = Scene::new("lookup");
    let a = scene.create_node("A", scene.root());
    let deep = scene.create_node("Target", a);
    let _shallow = scene.create_node("Target", scene.root());

    assert_eq!(scene.node_by_name("Target"), Some(deep));
    assert_eq!(scene.node_by_name("A"), Some(a));
    assert_eq!(scene.node_by_name("Root"), Some(scene.root()));
    assert_eq!(scene.node_by_name("missing"), None);
}

#[test]
fn walk_visits_parents_before_children_in_child_order() {
    let mut scene = Scene::new("walk");
    let a = scene.create_node("A", scene.root());
    scene.create_node("A1", a);
    scene.create_node("A2", a);
    scene.create_node("B", scene.root());

    let mut names = Vec::new();
    scene.walk(|_, node| names.push(node.name.clone()));
    assert_eq!(names, vec!["Root", "A", "A1", "A2", "B"]);
}

// ============================================================================
// Meshes
// ============================================================================

#[test]
fn mesh_registry_lookup_and_duplicate() {
    let mut scene = Scene::new("meshes");
    let cube = scene.add_mesh(Mesh::cube("Cube", Material::new(MaterialType::Diffuse)));

    let (key, mesh) = scene.mesh_by_name("Cube").unwrap();
    assert_eq!(key, cube);
    assert_eq!(mesh.index_count(), 36);
    assert!(scene.mesh_by_name("Sphere").is_none());

    let emissive = Material::colored(MaterialType::Emissive, Vec3::new(1.0, 0.5, 0.0));
    let copy = scene.duplicate_mesh(cube, "Indicator", emissive).unwrap();
    assert_ne!(copy, cube);
    let copied = scene.mesh(copy).unwrap();
    assert_eq!(copied.material.kind, MaterialType::Emissive);
    assert_eq!(copied.vertices, scene.mesh(cube).unwrap().vertices);
    assert_eq!(scene.meshes().len(), 2);
}

#[test]
fn one_mesh_attached_to_many_nodes() {
    let mut scene = Scene::new("instancing");
    let cube = scene.add_mesh(Mesh::cube("Cube", Material::default()));
    let a = scene.build_node("A").with_mesh(cube).build();
    let b = scene.create_node("B", scene.root());
    scene.attach_mesh(b, cube);

    for h in [a, b] {
        let node = scene.node(h).unwrap();
        assert_eq!(node.meshes().collect::<Vec<_>>(), vec![cube]);
        assert_eq!(node.renderables()[0].kind(), RenderableKind::Mesh);
    }
}

#[test]
fn removing_a_node_keeps_shared_meshes() {
    let mut scene = Scene::new("shared");
    let cube = scene.add_mesh(Mesh::cube("Cube", Material::default()));
    let a = scene.build_node("A").with_mesh(cube).build();
    scene.remove_node(a);
    assert!(scene.mesh(cube).is_some());
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn point_light_attaches_to_node() {
    let mut scene = Scene::new("lights");
    let holder = scene.create_node("Lamp", scene.root());
    let key = scene.add_point_light(holder, white_light("lamp")).unwrap();

    let node = scene.node(holder).unwrap();
    assert_eq!(node.lights().collect::<Vec<_>>(), vec![key]);
    assert_eq!(node.renderables()[0].kind(), RenderableKind::Light);
    assert_eq!(scene.light(key).unwrap().name, "lamp");
}

#[test]
fn removing_node_removes_its_lights() {
    let mut scene = Scene::new("lights");
    let holder = scene.create_node("Lamp", scene.root());
    let child = scene.create_node("Bulb", holder);
    let key = scene.add_point_light(child, white_light("bulb")).unwrap();

    scene.remove_node(holder);
    assert!(scene.light(key).is_none());
    assert_eq!(scene.light_count(), 0);
}

#[test]
fn default_light_radius_returns_previous() {
    let mut scene = Scene::new("radius");
    assert_eq!(scene.set_default_light_radius(5.0), 1.0);
    assert_eq!(scene.set_default_light_radius(2.0), 5.0);
    assert_eq!(scene.settings().default_light_radius, 2.0);
}

#[test]
fn gathered_lights_use_world_position_and_default_attenuation() {
    let mut scene = Scene::new("gather");
    scene.set_default_light_radius(4.0);
    let arm = scene.build_node("Arm").with_position(2.0, 0.0, 0.0).build();
    let lamp = scene
        .build_node("Lamp")
        .with_parent(arm)
        .with_position(0.0, 3.0, 0.0)
        .with_light(white_light("lamp"))
        .build();

    let explicit = Attenuation {
        constant: 1.0,
        linear: 0.1,
        quadratic: 0.01,
    };
    scene.add_point_light(lamp, white_light("second").with_attenuation(explicit));

    let lights = scene.gather_lights().to_vec();
    assert_eq!(lights.len(), 2);
    assert!(vec3_approx(lights[0].position, Vec3::new(2.0, 3.0, 0.0)));
    assert_eq!(lights[0].attenuation, Attenuation::from_radius(4.0));
    assert_eq!(lights[1].attenuation, explicit);
}

#[test]
fn invisible_subtree_hides_lights() {
    let mut scene = Scene::new("gather");
    let group = scene.create_node("Group", scene.root());
    let lamp = scene.create_node("Lamp", group);
    scene.add_point_light(lamp, white_light("hidden"));
    scene.build_node("Other").with_light(white_light("shown")).build();

    scene.set_visible(group, false);
    let lights = scene.gather_lights();
    assert_eq!(lights.len(), 1);
}

#[test]
fn lights_follow_tree_walk_order() {
    let mut scene = Scene::new("order");
    let a = scene.create_node("A", scene.root());
    let b = scene.create_node("B", scene.root());
    let a1 = scene.create_node("A1", a);
    let kb = scene.add_point_light(b, white_light("b")).unwrap();
    let ka1 = scene.add_point_light(a1, white_light("a1")).unwrap();
    let ka = scene.add_point_light(a, white_light("a")).unwrap();

    let keys: Vec<_> = scene.gather_lights().iter().map(|l| l.key).collect();
    assert_eq!(keys, vec![ka, ka1, kb]);
}

// ============================================================================
// Builder & settings
// ============================================================================

#[test]
fn node_builder_sets_transform_parent_and_visibility() {
    let mut scene = Scene::new("builder");
    let parent = scene.create_node("Parent", scene.root());
    let node = scene
        .build_node("Built")
        .with_parent(parent)
        .with_position(1.0, 2.0, 3.0)
        .with_scale(2.0)
        .visible(false)
        .build();

    let n = scene.node(node).unwrap();
    assert_eq!(n.parent(), Some(parent));
    assert!(!n.visible);
    assert!(vec3_approx(n.transform().position(), Vec3::new(1.0, 2.0, 3.0)));
    assert!(vec3_approx(n.transform().scale(), Vec3::splat(2.0)));
}

#[test]
fn settings_choose_lighting_strategy() {
    let settings = SceneSettings::from_json_str(
        r#"{ "lighting": { "light_buffer": { "capacity": 4 } }, "hermite_interpolation": true }"#,
    )
    .unwrap();
    let mut scene = Scene::with_settings("cfg", settings);
    assert_eq!(scene.settings().lighting, LightingStrategy::LightBuffer { capacity: 4 });
    assert_eq!(scene.interpolation_mode(), trellis::InterpolationMode::Hermite);

    scene.set_lighting_strategy(LightingStrategy::PerLightForward);
    assert_eq!(scene.settings().lighting, LightingStrategy::PerLightForward);
}

#[test]
fn settings_roundtrip_through_json() {
    let settings = SceneSettings {
        default_light_radius: 3.5,
        ..Default::default()
    };
    let json = settings.to_json_string().unwrap();
    assert_eq!(SceneSettings::from_json_str(&json).unwrap(), settings);
}
