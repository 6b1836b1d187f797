use kubesmith::{
    GenerationContext, GenerationEngine, Generator, OutputFormat, PropertyType, Template,
    TemplateField, TemplateResource,
};
use serde_json::json;

fn field(name: &str, ty: PropertyType, default: Option<serde_json::Value>) -> TemplateField {
    TemplateField {
        name: name.into(),
        field_type: ty,
        required: false,
        description: None,
        default,
        allowed: Vec::new(),
    }
}

fn stack_template() -> Template {
    let mut template = Template::new("web-stack");
    template.description = Some("Web tier with config".into());

    let mut deployment = TemplateResource::new("Deployment", "apps/v1");
    deployment.name = "web".into();
    deployment
        .selected_fields
        .push(field("replicas", PropertyType::Number, Some(json!(3))));
    deployment.selected_fields.push(field(
        "image",
        PropertyType::String,
        Some(json!("nginx:1.27")),
    ));
    template.add_resource(deployment);

    let mut service = TemplateResource::new("Service", "v1");
    service.name = "web-svc".into();
    service
        .selected_fields
        .push(field("port", PropertyType::Number, Some(json!(80))));
    template.add_resource(service);

    let mut config = TemplateResource::new("ConfigMap", "v1");
    config.name = "web-config".into();
    config
        .selected_fields
        .push(field("data", PropertyType::Object, None));
    template.add_resource(config);

    template
}

#[test]
fn resource_sets_agree_across_all_three_formats() {
    let engine = GenerationEngine::new();
    let template = stack_template();
    let mut context = GenerationContext::new();
    context.insert("replicas".into(), json!(5));

    let flat = engine
        .generate(&template, &context, OutputFormat::Manifest)
        .unwrap();
    let chart = engine
        .generate(&template, &context, OutputFormat::Chart)
        .unwrap();
    let overlay = engine
        .generate(&template, &context, OutputFormat::Overlay)
        .unwrap();

    assert_eq!(flat.resources, chart.resources);
    assert_eq!(chart.resources, overlay.resources);
    assert_eq!(
        flat.resources,
        ["Deployment/web", "Service/web-svc", "ConfigMap/web-config"]
    );
}

#[test]
fn field_sets_agree_across_all_three_formats() {
    let engine = GenerationEngine::new();
    let template = stack_template();
    let context = GenerationContext::new();

    // Flat: fields appear inline in the manifest body.
    let flat = engine
        .generate(&template, &context, OutputFormat::Manifest)
        .unwrap();
    let flat_body = &flat.files[0].contents;

    // Chart: fields appear as keys under each resource's values entry.
    let chart = engine
        .generate(&template, &context, OutputFormat::Chart)
        .unwrap();
    let values = chart
        .files
        .iter()
        .find(|f| f.path == "values.yaml")
        .unwrap();

    // Overlay: fields appear in the base documents.
    let overlay = engine
        .generate(&template, &context, OutputFormat::Overlay)
        .unwrap();
    let base_deployment = overlay
        .files
        .iter()
        .find(|f| f.path == "base/deployment-web.yaml")
        .unwrap();

    for field_name in ["replicas", "image", "port", "data"] {
        assert!(
            flat_body.contains(field_name),
            "flat output missing {field_name}"
        );
        assert!(
            values.contents.contains(field_name),
            "values.yaml missing {field_name}"
        );
    }
    assert!(base_deployment.contents.contains("replicas"));
    assert!(base_deployment.contents.contains("image"));
}

#[test]
fn default_values_agree_between_flat_and_chart_values() {
    let engine = GenerationEngine::new();
    let template = stack_template();
    let context = GenerationContext::new();

    let flat = engine
        .generate(&template, &context, OutputFormat::Manifest)
        .unwrap();
    let chart = engine
        .generate(&template, &context, OutputFormat::Chart)
        .unwrap();

    let values = chart
        .files
        .iter()
        .find(|f| f.path == "values.yaml")
        .unwrap();
    let parsed: serde_json::Value = serde_yaml::from_str(&values.contents).unwrap();

    assert_eq!(parsed["deployment_web"]["replicas"], json!(3));
    assert_eq!(parsed["deployment_web"]["image"], json!("nginx:1.27"));
    assert_eq!(parsed["service_web_svc"]["port"], json!(80));
    assert!(flat.files[0].contents.contains("replicas: 3"));
    assert!(flat.files[0].contents.contains("port: 80"));
}

#[test]
fn per_format_failures_stay_isolated() {
    let engine = GenerationEngine::new();
    let template = stack_template();
    let context = GenerationContext::new();

    let results = engine.generate_all(&template, &context, &OutputFormat::all());
    assert_eq!(results.len(), 3);
    for (format, result) in &results {
        assert!(result.is_ok(), "{format:?} failed: {result:?}");
    }
}
