//! Normalizes `slangc -reflection-json` output into [`ShaderReflection`].
//!
//! Only the parts of the document the runtime binds against are read:
//! global parameters, constant buffer layouts, and the compute thread
//! group size. Everything else in the (large) reflection tree is ignored.

use crate::error::SlangReflectError;
use crate::json::{self, JsonValue};
use crate::model::{
    ConstantBuffer, ConstantBufferMember, ResourceAccess, ResourceBinding, ShaderReflection,
    ShaderResourceType,
};

/// Parses a Slang reflection JSON document.
///
/// Parameters without a `name` member are skipped. Binding indices and
/// spaces default to zero when the document omits them.
pub fn reflection_from_json(text: &str) -> Result<ShaderReflection, SlangReflectError> {
    let root = json::parse(text)?;
    if !root.is_object() {
        return Err(SlangReflectError::NotAnObject);
    }

    let mut reflection = ShaderReflection::default();

    if let Some(parameters) = root.get("parameters").and_then(JsonValue::as_array) {
        for parameter in parameters {
            read_parameter(parameter, &mut reflection);
        }
    }

    if let Some(entry) = root
        .get("entryPoints")
        .and_then(JsonValue::as_array)
        .and_then(|entries| entries.first())
    {
        read_thread_group_size(entry, &mut reflection.thread_group_size);
    }

    Ok(reflection)
}

fn read_parameter(parameter: &JsonValue, reflection: &mut ShaderReflection) {
    let Some(name) = parameter.get("name").and_then(JsonValue::as_str) else {
        return;
    };

    let mut binding_index = 0;
    let mut binding_set = 0;
    if let Some(binding) = parameter.get("binding") {
        if let Some(index) = binding.get("index").and_then(JsonValue::as_u32) {
            binding_index = index;
        }
        if let Some(space) = binding.get("space").and_then(JsonValue::as_u32) {
            binding_set = space;
        }
    }

    let type_info = parameter.get("type");
    let kind = type_info
        .and_then(|info| info.get("kind"))
        .and_then(JsonValue::as_str)
        .unwrap_or("");
    let base_shape = type_info
        .and_then(|info| info.get("baseShape"))
        .and_then(JsonValue::as_str)
        .unwrap_or("");
    let access = type_info
        .and_then(|info| info.get("access"))
        .and_then(JsonValue::as_str)
        .unwrap_or("");

    let (ty, access) = map_resource_kind(kind, base_shape, access);
    reflection.resources.push(ResourceBinding {
        name: name.to_string(),
        ty,
        access,
        set: binding_set,
        binding: binding_index,
        register: binding_index,
        space: binding_set,
    });

    if kind == "constantBuffer" {
        let mut buffer = ConstantBuffer {
            name: name.to_string(),
            set: binding_set,
            binding: binding_index,
            register: binding_index,
            space: binding_set,
            ..ConstantBuffer::default()
        };

        // Slang wraps the buffer contents in an elementTypeLayout node.
        let layout = parameter.get("typeLayout").map(|type_layout| {
            match type_layout.get("elementTypeLayout") {
                Some(element) if element.is_object() => element,
                _ => type_layout,
            }
        });
        if let Some(layout) = layout {
            buffer.size_bytes = layout_size_bytes(layout).unwrap_or(0);
            collect_member_fields(layout, "", 0, &mut buffer.members);
        }

        reflection.constant_buffers.push(buffer);
    }
}

fn read_thread_group_size(entry: &JsonValue, thread_group_size: &mut [u32; 3]) {
    let Some(size) = entry.get("threadGroupSize").and_then(JsonValue::as_array) else {
        return;
    };
    if size.len() < 3 {
        return;
    }
    for (axis, value) in thread_group_size.iter_mut().zip(size) {
        if let Some(number) = value.as_u32() {
            *axis = number;
        }
    }
}

fn map_resource_kind(
    kind: &str,
    base_shape: &str,
    access: &str,
) -> (ShaderResourceType, ResourceAccess) {
    let access = if access == "readWrite" {
        ResourceAccess::ReadWrite
    } else {
        ResourceAccess::ReadOnly
    };
    let ty = match kind {
        "constantBuffer" => ShaderResourceType::ConstantBuffer,
        "samplerState" => ShaderResourceType::Sampler,
        "resource" => {
            // Slang emits camelCase shapes like `structuredBuffer`.
            let shape = base_shape.to_ascii_lowercase();
            if shape.contains("texture") {
                if access == ResourceAccess::ReadWrite {
                    ShaderResourceType::StorageTexture
                } else {
                    ShaderResourceType::Texture
                }
            } else if shape.contains("buffer") {
                ShaderResourceType::StorageBuffer
            } else {
                ShaderResourceType::Texture
            }
        }
        _ => ShaderResourceType::Texture,
    };
    (ty, access)
}

/// Byte offset of a field. Slang emits either a bare number or an object
/// keyed by layout unit.
fn layout_offset_bytes(value: &JsonValue) -> Option<u32> {
    if let Some(number) = value.as_u32() {
        return Some(number);
    }
    for key in ["uniform", "constantBuffer", "byteOffset", "offset"] {
        if let Some(number) = value.get(key).and_then(JsonValue::as_u32) {
            return Some(number);
        }
    }
    None
}

fn layout_size_bytes(layout: &JsonValue) -> Option<u32> {
    let size = layout.get("size");
    if let Some(number) = size.and_then(JsonValue::as_u32) {
        return Some(number);
    }
    if let Some(number) = layout.get("uniformSize").and_then(JsonValue::as_u32) {
        return Some(number);
    }
    if let Some(size) = size.filter(|value| value.is_object()) {
        for key in ["uniform", "constantBuffer", "byteSize"] {
            if let Some(number) = size.get(key).and_then(JsonValue::as_u32) {
                return Some(number);
            }
        }
    }
    None
}

/// Flattens `fields` into dotted member names. Struct members recurse so
/// both the aggregate and its leaves are emitted; array elements do not.
fn collect_member_fields(
    layout: &JsonValue,
    prefix: &str,
    base_offset: u32,
    members: &mut Vec<ConstantBufferMember>,
) {
    let Some(fields) = layout.get("fields").and_then(JsonValue::as_array) else {
        return;
    };

    for field in fields {
        let Some(name) = field.get("name").and_then(JsonValue::as_str) else {
            continue;
        };

        let offset = field
            .get("offset")
            .and_then(layout_offset_bytes)
            .or_else(|| field.get("uniformOffset").and_then(JsonValue::as_u32))
            .unwrap_or(0);

        let type_layout = field.get("typeLayout");
        let size = type_layout
            .and_then(layout_size_bytes)
            .or_else(|| field.get("size").and_then(JsonValue::as_u32))
            .unwrap_or(0);

        let type_info = field.get("type");
        let kind = type_info
            .and_then(|info| info.get("kind"))
            .and_then(JsonValue::as_str)
            .unwrap_or("");

        let mut element_count = field
            .get("elementCount")
            .and_then(JsonValue::as_u32)
            .unwrap_or(0);
        if element_count == 0 {
            element_count = type_info
                .and_then(|info| info.get("elementCount"))
                .and_then(JsonValue::as_u32)
                .unwrap_or(0);
        }

        let element_stride = if size > 0 && element_count > 0 {
            size / element_count
        } else {
            0
        };

        let full_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        members.push(ConstantBufferMember {
            name: full_name.clone(),
            offset: base_offset + offset,
            size,
            element_count,
            element_stride,
        });

        if kind == "struct" {
            if let Some(inner) = type_layout {
                collect_member_fields(inner, &full_name, base_offset + offset, members);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCENE_JSON: &str = r#"{
        "parameters": [
            {
                "name": "SceneConstants",
                "binding": { "kind": "descriptorTableSlot", "index": 0 },
                "type": { "kind": "constantBuffer" },
                "typeLayout": {
                    "elementTypeLayout": {
                        "size": { "uniform": 144 },
                        "fields": [
                            {
                                "name": "ViewProjection",
                                "offset": { "uniform": 0 },
                                "typeLayout": { "size": 64 },
                                "type": { "kind": "matrix" }
                            },
                            {
                                "name": "Sun",
                                "offset": { "uniform": 64 },
                                "typeLayout": {
                                    "size": 32,
                                    "fields": [
                                        {
                                            "name": "Direction",
                                            "offset": { "uniform": 0 },
                                            "typeLayout": { "size": 12 },
                                            "type": { "kind": "vector" }
                                        },
                                        {
                                            "name": "Intensity",
                                            "offset": { "uniform": 12 },
                                            "typeLayout": { "size": 4 },
                                            "type": { "kind": "scalar" }
                                        }
                                    ]
                                },
                                "type": { "kind": "struct" }
                            },
                            {
                                "name": "CascadeSplits",
                                "offset": { "uniform": 96 },
                                "typeLayout": { "size": 48 },
                                "type": { "kind": "array" },
                                "elementCount": 4
                            }
                        ]
                    }
                }
            },
            {
                "name": "AlbedoMap",
                "binding": { "index": 1, "space": 2 },
                "type": { "kind": "resource", "baseShape": "texture2D" }
            },
            {
                "name": "LinearSampler",
                "binding": { "index": 0, "space": 1 },
                "type": { "kind": "samplerState" }
            },
            {
                "name": "Particles",
                "binding": { "index": 3 },
                "type": { "kind": "resource", "baseShape": "structuredBuffer", "access": "readWrite" }
            },
            {
                "name": "OutputImage",
                "binding": { "index": 4 },
                "type": { "kind": "resource", "baseShape": "texture2D", "access": "readWrite" }
            }
        ],
        "entryPoints": [
            { "name": "main", "stage": "compute", "threadGroupSize": [8, 8, 1] }
        ]
    }"#;

    #[test]
    fn resources_normalize_kind_and_access() {
        let reflection = reflection_from_json(SCENE_JSON).unwrap();
        assert_eq!(reflection.resources.len(), 5);

        let scene = &reflection.resources[0];
        assert_eq!(scene.name, "SceneConstants");
        assert_eq!(scene.ty, ShaderResourceType::ConstantBuffer);
        assert_eq!(scene.access, ResourceAccess::ReadOnly);
        assert_eq!((scene.set, scene.binding), (0, 0));

        let albedo = &reflection.resources[1];
        assert_eq!(albedo.ty, ShaderResourceType::Texture);
        assert_eq!((albedo.set, albedo.binding), (2, 1));
        assert_eq!((albedo.space, albedo.register), (2, 1));

        let sampler = &reflection.resources[2];
        assert_eq!(sampler.ty, ShaderResourceType::Sampler);
        assert_eq!((sampler.set, sampler.binding), (1, 0));

        let particles = &reflection.resources[3];
        assert_eq!(particles.ty, ShaderResourceType::StorageBuffer);
        assert_eq!(particles.access, ResourceAccess::ReadWrite);

        let output = &reflection.resources[4];
        assert_eq!(output.ty, ShaderResourceType::StorageTexture);
        assert_eq!(output.access, ResourceAccess::ReadWrite);
    }

    #[test]
    fn constant_buffer_members_flatten_with_dotted_names() {
        let reflection = reflection_from_json(SCENE_JSON).unwrap();
        assert_eq!(reflection.constant_buffers.len(), 1);

        let buffer = &reflection.constant_buffers[0];
        assert_eq!(buffer.name, "SceneConstants");
        assert_eq!(buffer.size_bytes, 144);

        let summary: Vec<(&str, u32, u32, u32, u32)> = buffer
            .members
            .iter()
            .map(|member| {
                (
                    member.name.as_str(),
                    member.offset,
                    member.size,
                    member.element_count,
                    member.element_stride,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ViewProjection", 0, 64, 0, 0),
                ("Sun", 64, 32, 0, 0),
                ("Sun.Direction", 64, 12, 0, 0),
                ("Sun.Intensity", 76, 4, 0, 0),
                ("CascadeSplits", 96, 48, 4, 12),
            ]
        );
    }

    #[test]
    fn thread_group_size_is_read_from_the_first_entry_point() {
        let reflection = reflection_from_json(SCENE_JSON).unwrap();
        assert_eq!(reflection.thread_group_size, [8, 8, 1]);
        assert_eq!(reflection.push_constant_bytes, 0);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let reflection = reflection_from_json("{}").unwrap();
        assert!(reflection.resources.is_empty());
        assert!(reflection.constant_buffers.is_empty());
        assert_eq!(reflection.thread_group_size, [1, 1, 1]);
    }

    #[test]
    fn buffer_layout_without_element_wrapper_is_read_directly() {
        let reflection = reflection_from_json(
            r#"{
                "parameters": [
                    {
                        "name": "Globals",
                        "binding": { "index": 2 },
                        "type": { "kind": "constantBuffer" },
                        "typeLayout": {
                            "uniformSize": 16,
                            "fields": [
                                { "name": "Time", "uniformOffset": 4, "size": 4 }
                            ]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let buffer = &reflection.constant_buffers[0];
        assert_eq!(buffer.size_bytes, 16);
        assert_eq!(buffer.binding, 2);
        assert_eq!(buffer.members.len(), 1);
        assert_eq!(buffer.members[0].name, "Time");
        assert_eq!(buffer.members[0].offset, 4);
        assert_eq!(buffer.members[0].size, 4);
    }

    #[test]
    fn unnamed_parameters_are_skipped() {
        let reflection = reflection_from_json(
            r#"{ "parameters": [ { "binding": { "index": 0 } }, 7 ] }"#,
        )
        .unwrap();
        assert!(reflection.resources.is_empty());
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert_eq!(
            reflection_from_json("[1, 2]"),
            Err(SlangReflectError::NotAnObject)
        );
        assert!(matches!(
            reflection_from_json("not json"),
            Err(SlangReflectError::Json(_))
        ));
    }

    #[test]
    fn unknown_kinds_fall_back_to_texture() {
        let (ty, access) = map_resource_kind("somethingNew", "", "");
        assert_eq!(ty, ShaderResourceType::Texture);
        assert_eq!(access, ResourceAccess::ReadOnly);

        let (ty, access) = map_resource_kind("resource", "unknownShape", "readWrite");
        assert_eq!(ty, ShaderResourceType::Texture);
        assert_eq!(access, ResourceAccess::ReadWrite);
    }

    #[test]
    fn camel_case_shapes_match_buffers() {
        let (ty, _) = map_resource_kind("resource", "byteAddressBuffer", "");
        assert_eq!(ty, ShaderResourceType::StorageBuffer);

        let (ty, _) = map_resource_kind("resource", "textureBuffer", "");
        assert_eq!(ty, ShaderResourceType::Texture);
    }
}
