/// VulkanRenderPass - single-subpass render pass built from a RenderPassDesc

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::prism::render::{RenderPass, RenderPassDesc, AttachmentDesc, LoadOp, StoreOp};
use prism_engine::{engine_bail, engine_err};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{format_to_vk, image_layout_to_vk, load_op_to_vk, samples_to_vk, store_op_to_vk};

pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    desc: RenderPassDesc,
}

fn attachment_description(attachment: &AttachmentDesc) -> vk::AttachmentDescription {
    // Stencil follows depth for D24S8; color formats ignore it
    let (stencil_load, stencil_store) = if attachment.format.is_depth() {
        (attachment.load_op, attachment.store_op)
    } else {
        (LoadOp::DontCare, StoreOp::DontCare)
    };

    vk::AttachmentDescription::default()
        .format(format_to_vk(attachment.format))
        .samples(samples_to_vk(attachment.samples))
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(load_op_to_vk(stencil_load))
        .stencil_store_op(store_op_to_vk(stencil_store))
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout))
}

impl VulkanRenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        if desc.color_attachments.is_empty() && desc.depth_attachment.is_none() {
            engine_bail!("prism::vulkan", "Render pass needs at least one attachment");
        }
        if let Some(color) = desc.color_attachments.iter().find(|a| a.format.is_depth()) {
            engine_bail!("prism::vulkan", "Depth format {:?} used as a color attachment", color.format);
        }

        let mut attachments: Vec<vk::AttachmentDescription> = desc.color_attachments
            .iter()
            .map(attachment_description)
            .collect();

        let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_attachments.len() as u32)
            .map(|i| vk::AttachmentReference::default()
                .attachment(i)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .collect();

        let depth_ref = desc.depth_attachment.as_ref().map(|depth| {
            attachments.push(attachment_description(depth));
            vk::AttachmentReference::default()
                .attachment(attachments.len() as u32 - 1)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(depth_ref) = depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let (stage_mask, access_mask) = if depth_ref.is_some() {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            )
        };

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(access_mask);

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe {
            ctx.device.create_render_pass(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create render pass: {:?}", e))?
        };

        Ok(Self { ctx, render_pass, desc: desc.clone() })
    }
}

impl RenderPass for VulkanRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
