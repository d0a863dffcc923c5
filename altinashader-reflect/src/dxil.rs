//! DXIL reflection through the D3D12 shader reflection interfaces.
//!
//! `D3DReflect` handles plain DXBC and signed DXIL containers compiled
//! against a matching SDK. When it refuses the blob, the DXC container
//! reflection API is used to locate the DXIL part and reflect that
//! directly, which also covers containers produced by newer compilers.

use std::ffi::c_void;

use windows::core::{Interface, PCSTR};
use windows::Win32::Graphics::Direct3D::Dxc::{
    DxcCreateInstance, CLSID_DxcContainerReflection, CLSID_DxcUtils, IDxcBlob,
    IDxcContainerReflection, IDxcUtils, DXC_CP_ACP,
};
use windows::Win32::Graphics::Direct3D::Fxc::D3DReflect;
use windows::Win32::Graphics::Direct3D::{
    D3D_CT_CBUFFER, D3D_CT_TBUFFER, D3D_SHADER_INPUT_TYPE, D3D_SIT_BYTEADDRESS, D3D_SIT_CBUFFER,
    D3D_SIT_RTACCELERATIONSTRUCTURE, D3D_SIT_SAMPLER, D3D_SIT_STRUCTURED, D3D_SIT_TBUFFER,
    D3D_SIT_TEXTURE, D3D_SIT_UAV_APPEND_STRUCTURED, D3D_SIT_UAV_CONSUME_STRUCTURED,
    D3D_SIT_UAV_FEEDBACKTEXTURE, D3D_SIT_UAV_RWBYTEADDRESS, D3D_SIT_UAV_RWSTRUCTURED,
    D3D_SIT_UAV_RWSTRUCTURED_WITH_COUNTER, D3D_SIT_UAV_RWTYPED, D3D_SVC_STRUCT,
};
use windows::Win32::Graphics::Direct3D12::{
    ID3D12ShaderReflection, ID3D12ShaderReflectionType, D3D12_SHADER_BUFFER_DESC,
    D3D12_SHADER_DESC, D3D12_SHADER_INPUT_BIND_DESC, D3D12_SHADER_TYPE_DESC,
    D3D12_SHADER_VARIABLE_DESC,
};

use crate::error::DxilReflectError;
use crate::model::{
    ConstantBuffer, ConstantBufferMember, ResourceAccess, ResourceBinding, ShaderReflection,
    ShaderResourceType,
};

/// Reflects compiled DXBC or DXIL bytecode.
///
/// Resources and constant buffers that fail to describe themselves are
/// skipped rather than failing the whole shader.
pub fn reflect_dxil(bytecode: &[u8]) -> Result<ShaderReflection, DxilReflectError> {
    if bytecode.is_empty() {
        return Err(DxilReflectError::EmptyBytecode);
    }
    let reflector = match reflect_direct(bytecode) {
        Some(reflector) => reflector,
        None => reflect_from_container(bytecode)?,
    };
    Ok(read_reflection(&reflector))
}

fn reflect_direct(bytecode: &[u8]) -> Option<ID3D12ShaderReflection> {
    let mut reflector: Option<ID3D12ShaderReflection> = None;
    let result = unsafe {
        D3DReflect(
            bytecode.as_ptr().cast(),
            bytecode.len(),
            &ID3D12ShaderReflection::IID,
            &mut reflector as *mut Option<ID3D12ShaderReflection> as *mut *mut c_void,
        )
    };
    result.ok().and(reflector)
}

fn reflect_from_container(bytecode: &[u8]) -> Result<ID3D12ShaderReflection, DxilReflectError> {
    const DXIL_PART: u32 = u32::from_le_bytes(*b"DXIL");

    unsafe {
        let utils: IDxcUtils =
            DxcCreateInstance(&CLSID_DxcUtils).map_err(|_| DxilReflectError::CreateUtils)?;
        let container: IDxcContainerReflection = DxcCreateInstance(&CLSID_DxcContainerReflection)
            .map_err(|_| DxilReflectError::CreateContainerReflection)?;

        let blob = utils
            .CreateBlobFromPinned(bytecode.as_ptr().cast(), bytecode.len() as u32, DXC_CP_ACP)
            .map_err(|_| DxilReflectError::CreateBlob)?;
        let blob: IDxcBlob = blob.cast().map_err(|_| DxilReflectError::CreateBlob)?;
        container
            .Load(&blob)
            .map_err(|_| DxilReflectError::LoadContainer)?;

        let part = container
            .FindFirstPartKind(DXIL_PART)
            .map_err(|_| DxilReflectError::MissingDxilPart)?;
        container
            .GetPartReflection(part)
            .map_err(|_| DxilReflectError::PartReflection)
    }
}

fn read_reflection(reflector: &ID3D12ShaderReflection) -> ShaderReflection {
    let mut reflection = ShaderReflection::default();

    let mut desc = D3D12_SHADER_DESC::default();
    let _ = unsafe { reflector.GetDesc(&mut desc) };

    for index in 0..desc.BoundResources {
        let mut bind = D3D12_SHADER_INPUT_BIND_DESC::default();
        if unsafe { reflector.GetResourceBindingDesc(index, &mut bind) }.is_err() {
            continue;
        }
        let (ty, access) = map_resource_type(bind.Type);
        reflection.resources.push(ResourceBinding {
            name: read_name(bind.Name),
            ty,
            access,
            set: bind.Space,
            binding: bind.BindPoint,
            register: bind.BindPoint,
            space: bind.Space,
        });
    }

    for index in 0..desc.ConstantBuffers {
        let Some(buffer) = (unsafe { reflector.GetConstantBufferByIndex(index) }) else {
            continue;
        };
        let mut buffer_desc = D3D12_SHADER_BUFFER_DESC::default();
        if unsafe { buffer.GetDesc(&mut buffer_desc) }.is_err() {
            continue;
        }
        if buffer_desc.Type != D3D_CT_CBUFFER && buffer_desc.Type != D3D_CT_TBUFFER {
            continue;
        }

        let mut out = ConstantBuffer {
            name: read_name(buffer_desc.Name),
            size_bytes: buffer_desc.Size,
            ..ConstantBuffer::default()
        };
        if let Some(binding) = find_buffer_binding(&reflection.resources, &out.name) {
            out.set = binding.set;
            out.binding = binding.binding;
            out.register = binding.register;
            out.space = binding.space;
        }

        for variable_index in 0..buffer_desc.Variables {
            let Some(variable) = (unsafe { buffer.GetVariableByIndex(variable_index) }) else {
                continue;
            };
            let mut variable_desc = D3D12_SHADER_VARIABLE_DESC::default();
            if unsafe { variable.GetDesc(&mut variable_desc) }.is_err() {
                continue;
            }

            let variable_type = unsafe { variable.GetType() };
            let mut type_desc = D3D12_SHADER_TYPE_DESC::default();
            if let Some(variable_type) = &variable_type {
                let _ = unsafe { variable_type.GetDesc(&mut type_desc) };
            }

            let name = read_name(variable_desc.Name);
            let element_count = type_desc.Elements;
            let element_stride = if variable_desc.Size > 0 && element_count > 0 {
                variable_desc.Size / element_count
            } else {
                0
            };
            out.members.push(ConstantBufferMember {
                name: name.clone(),
                offset: variable_desc.StartOffset,
                size: variable_desc.Size,
                element_count,
                element_stride,
            });

            // Flatten nested struct members; arrays of structs stay opaque.
            if let Some(variable_type) = variable_type {
                if type_desc.Class == D3D_SVC_STRUCT
                    && type_desc.Elements == 0
                    && type_desc.Members > 0
                    && variable_desc.Size > 0
                {
                    append_struct_members(
                        &variable_type,
                        &name,
                        variable_desc.StartOffset,
                        variable_desc.Size,
                        &mut out.members,
                    );
                }
            }
        }

        reflection.constant_buffers.push(out);
    }

    let mut size_x = 1u32;
    let mut size_y = 1u32;
    let mut size_z = 1u32;
    unsafe {
        reflector.GetThreadGroupSize(Some(&mut size_x), Some(&mut size_y), Some(&mut size_z));
    }
    reflection.thread_group_size = [size_x, size_y, size_z];

    reflection
}

fn map_resource_type(ty: D3D_SHADER_INPUT_TYPE) -> (ShaderResourceType, ResourceAccess) {
    match ty {
        D3D_SIT_CBUFFER | D3D_SIT_TBUFFER => {
            (ShaderResourceType::ConstantBuffer, ResourceAccess::ReadOnly)
        }
        D3D_SIT_SAMPLER => (ShaderResourceType::Sampler, ResourceAccess::ReadOnly),
        D3D_SIT_TEXTURE => (ShaderResourceType::Texture, ResourceAccess::ReadOnly),
        D3D_SIT_STRUCTURED | D3D_SIT_BYTEADDRESS => {
            (ShaderResourceType::StorageBuffer, ResourceAccess::ReadOnly)
        }
        D3D_SIT_UAV_RWTYPED
        | D3D_SIT_UAV_RWSTRUCTURED
        | D3D_SIT_UAV_RWBYTEADDRESS
        | D3D_SIT_UAV_APPEND_STRUCTURED
        | D3D_SIT_UAV_CONSUME_STRUCTURED
        | D3D_SIT_UAV_RWSTRUCTURED_WITH_COUNTER
        | D3D_SIT_UAV_FEEDBACKTEXTURE => {
            (ShaderResourceType::StorageTexture, ResourceAccess::ReadWrite)
        }
        D3D_SIT_RTACCELERATIONSTRUCTURE => (
            ShaderResourceType::AccelerationStructure,
            ResourceAccess::ReadOnly,
        ),
        _ => (ShaderResourceType::Texture, ResourceAccess::ReadOnly),
    }
}

fn find_buffer_binding<'a>(
    resources: &'a [ResourceBinding],
    name: &str,
) -> Option<&'a ResourceBinding> {
    resources
        .iter()
        .find(|resource| resource.ty == ShaderResourceType::ConstantBuffer && resource.name == name)
}

fn read_name(name: PCSTR) -> String {
    if name.is_null() {
        return String::new();
    }
    unsafe { name.to_string() }.unwrap_or_default()
}

/// Span of a struct member, derived from the next member's offset since
/// the reflection API does not report sizes for nested members.
fn member_span(offset: u32, next_offset: Option<u32>, parent_size: u32) -> u32 {
    if offset >= parent_size {
        return 0;
    }
    next_offset.unwrap_or(parent_size).saturating_sub(offset)
}

fn append_struct_members(
    ty: &ID3D12ShaderReflectionType,
    prefix: &str,
    base_offset: u32,
    parent_size: u32,
    members: &mut Vec<ConstantBufferMember>,
) {
    if parent_size == 0 {
        return;
    }
    let mut type_desc = D3D12_SHADER_TYPE_DESC::default();
    if unsafe { ty.GetDesc(&mut type_desc) }.is_err() || type_desc.Members == 0 {
        return;
    }

    struct MemberSlot {
        name: String,
        ty: ID3D12ShaderReflectionType,
        desc: D3D12_SHADER_TYPE_DESC,
        offset: u32,
    }

    let mut slots = Vec::new();
    for index in 0..type_desc.Members {
        let member_name = unsafe { ty.GetMemberTypeName(index) };
        if member_name.is_null() {
            continue;
        }
        let Some(member_type) = (unsafe { ty.GetMemberTypeByIndex(index) }) else {
            continue;
        };
        let mut member_desc = D3D12_SHADER_TYPE_DESC::default();
        if unsafe { member_type.GetDesc(&mut member_desc) }.is_err() {
            continue;
        }
        slots.push(MemberSlot {
            name: read_name(member_name),
            ty: member_type,
            offset: member_desc.Offset,
            desc: member_desc,
        });
    }
    if slots.is_empty() {
        return;
    }
    slots.sort_by_key(|slot| slot.offset);

    for (index, slot) in slots.iter().enumerate() {
        let next_offset = slots.get(index + 1).map(|next| next.offset);
        let size = member_span(slot.offset, next_offset, parent_size);
        let element_count = slot.desc.Elements;
        let element_stride = if size > 0 && element_count > 0 {
            size / element_count
        } else {
            0
        };

        let full_name = format!("{prefix}.{}", slot.name);
        members.push(ConstantBufferMember {
            name: full_name.clone(),
            offset: base_offset + slot.offset,
            size,
            element_count,
            element_stride,
        });

        if slot.desc.Class == D3D_SVC_STRUCT
            && slot.desc.Elements == 0
            && slot.desc.Members > 0
            && size > 0
        {
            append_struct_members(&slot.ty, &full_name, base_offset + slot.offset, size, members);
        }
    }
}
