use quotekit_core::error::GeometryParseError;
use quotekit_core::extract::ExtractConfig;
use quotekit_core::model::Units;
use quotekit_import_step::entities::scan_entities;
use quotekit_import_step::extract_from_str;
use quotekit_import_step::structure::{analyze_structure, detect_length_unit, VoidShell};

const UNITS_MM: &str = "#900=( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );";

/// Root assembly placing a bolt twice, plus a loose plate and an unnamed body.
fn assembly_records() -> String {
    [
        "#1=PRODUCT('ASM','Assembly','',(#100));",
        "#2=PRODUCT_DEFINITION_FORMATION('','',#1);",
        "#3=PRODUCT_DEFINITION('design','',#2,#101);",
        "#10=PRODUCT('BOLT','Bolt_Default<As Machined>','',(#100));",
        "#11=PRODUCT_DEFINITION_FORMATION('','',#10);",
        "#12=PRODUCT_DEFINITION('design','',#11,#101);",
        "#13=PRODUCT_DEFINITION_SHAPE('','',#12);",
        "#14=SHAPE_DEFINITION_REPRESENTATION(#13,#15);",
        "#15=SHAPE_REPRESENTATION('Bolt',(#16),#102);",
        "#17=ADVANCED_BREP_SHAPE_REPRESENTATION('bolt-brep',(#18),#102);",
        "#18=MANIFOLD_SOLID_BREP('Solid1',#19);",
        "#20=SHAPE_REPRESENTATION_RELATIONSHIP('','',#15,#17);",
        "#30=NEXT_ASSEMBLY_USAGE_OCCURRENCE('1','Bolt:1','',#3,#12,$);",
        "#31=NEXT_ASSEMBLY_USAGE_OCCURRENCE('2','Bolt:2','',#3,#12,$);",
        "#41=MANIFOLD_SOLID_BREP('',#40);",
        "#42=ADVANCED_BREP_SHAPE_REPRESENTATION('Plate',(#41),#102);",
        "#50=BREP_WITH_VOIDS('',#51,(#52));",
        UNITS_MM,
    ]
    .join("\n")
}

#[test]
fn cavity_shells_belong_to_their_solid() {
    let structure = analyze_structure(&scan_entities(&assembly_records()));

    assert_eq!(3, structure.solids.len());
    assert_eq!(51, structure.solids[&50].outer);
    assert_eq!(
        vec![VoidShell {
            shell: 52,
            reversed: false
        }],
        structure.solids[&50].voids
    );
    assert!(structure.solids[&18].voids.is_empty());
}

#[test]
fn oriented_cavity_shells_keep_their_orientation() {
    let raw = [
        "#1=BREP_WITH_VOIDS('block',#2,(#3,#4));",
        "#3=ORIENTED_CLOSED_SHELL('',*,#5,.F.);",
        "#4=ORIENTED_CLOSED_SHELL('',*,#6,.T.);",
    ]
    .join("\n");

    let structure = analyze_structure(&scan_entities(&raw));
    let solid = &structure.solids[&1];
    assert_eq!(2, solid.outer);
    assert_eq!(
        vec![
            VoidShell {
                shell: 5,
                reversed: true
            },
            VoidShell {
                shell: 6,
                reversed: false
            },
        ],
        solid.voids
    );
    assert_eq!(Some("block"), solid.label.as_deref());
}

#[test]
fn labels_follow_product_then_solid_then_representation() {
    let structure = analyze_structure(&scan_entities(&assembly_records()));

    assert_eq!(structure.solids[&18].label.as_deref(), Some("Bolt_Default<As Machined>"));
    assert_eq!(structure.solids[&41].label.as_deref(), Some("Plate"));
    assert_eq!(structure.solids[&50].label, None);
    assert!(structure.has_assembly);
}

#[test]
fn occurrences_count_assembly_usages() {
    let structure = analyze_structure(&scan_entities(&assembly_records()));

    assert_eq!(structure.solids[&18].occurrences, 2);
    assert_eq!(structure.solids[&41].occurrences, 1);
    // Solids outside any product still count once.
    assert_eq!(structure.solids[&50].occurrences, 1);
    assert!(!structure.solids.contains_key(&12345));
}

#[test]
fn nested_usages_multiply() {
    let raw = [
        "#1=PRODUCT_DEFINITION('design','',#901,#101);",
        "#2=PRODUCT_DEFINITION('design','',#902,#101);",
        "#3=PRODUCT_DEFINITION('design','',#903,#101);",
        // Sub-assembly #2 is placed twice in root #1.
        "#10=NEXT_ASSEMBLY_USAGE_OCCURRENCE('a','','',#1,#2,$);",
        "#11=NEXT_ASSEMBLY_USAGE_OCCURRENCE('b','','',#1,#2,$);",
        // Part #3 is placed three times in #2 and once directly in the root.
        "#12=NEXT_ASSEMBLY_USAGE_OCCURRENCE('c','','',#2,#3,$);",
        "#13=NEXT_ASSEMBLY_USAGE_OCCURRENCE('d','','',#2,#3,$);",
        "#14=NEXT_ASSEMBLY_USAGE_OCCURRENCE('e','','',#2,#3,$);",
        "#15=NEXT_ASSEMBLY_USAGE_OCCURRENCE('f','','',#1,#3,$);",
        "#20=PRODUCT_DEFINITION_SHAPE('','',#3);",
        "#21=SHAPE_DEFINITION_REPRESENTATION(#20,#22);",
        "#22=ADVANCED_BREP_SHAPE_REPRESENTATION('pin',(#23),#102);",
        "#23=MANIFOLD_SOLID_BREP('pin',#24);",
    ]
    .join("\n");

    let structure = analyze_structure(&scan_entities(&raw));
    assert_eq!(structure.solids[&23].occurrences, 7);
    assert_eq!(structure.solids[&23].label.as_deref(), Some("pin"));
}

#[test]
fn usage_cycles_do_not_hang() {
    let raw = [
        "#1=PRODUCT_DEFINITION('design','',#901,#101);",
        "#2=PRODUCT_DEFINITION('design','',#902,#101);",
        "#10=NEXT_ASSEMBLY_USAGE_OCCURRENCE('a','','',#1,#2,$);",
        "#11=NEXT_ASSEMBLY_USAGE_OCCURRENCE('b','','',#2,#1,$);",
        "#20=PRODUCT_DEFINITION_SHAPE('','',#2);",
        "#21=SHAPE_DEFINITION_REPRESENTATION(#20,#22);",
        "#22=ADVANCED_BREP_SHAPE_REPRESENTATION('',(#23),#102);",
        "#23=MANIFOLD_SOLID_BREP('',#24);",
    ]
    .join("\n");

    let structure = analyze_structure(&scan_entities(&raw));
    assert!(structure.solids[&23].occurrences >= 1);
}

#[test]
fn length_units_are_detected() {
    assert_eq!(detect_length_unit(&scan_entities(UNITS_MM)), Units::Millimeters);
    assert_eq!(
        detect_length_unit(&scan_entities(
            "#5=( CONVERSION_BASED_UNIT('INCH',#6) LENGTH_UNIT() NAMED_UNIT(#7) );"
        )),
        Units::Inches
    );
    assert_eq!(
        detect_length_unit(&scan_entities(
            "#5=( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT($,.METRE.) );"
        )),
        Units::Meters
    );
    assert_eq!(
        detect_length_unit(&scan_entities(
            "#5=( NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.) );"
        )),
        Units::Unknown
    );
}

#[test]
fn globally_assigned_inch_unit_wins_over_its_millimeter_base() {
    let raw = [
        "#183=( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );",
        "#184=LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4),#183);",
        "#185=( CONVERSION_BASED_UNIT('INCH',#184) LENGTH_UNIT() NAMED_UNIT(#186) );",
        "#186=DIMENSIONAL_EXPONENTS(1.,0.,0.,0.,0.,0.,0.);",
        "#187=( NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.) );",
        "#190=( GEOMETRIC_REPRESENTATION_CONTEXT(3) \
         GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#191)) \
         GLOBAL_UNIT_ASSIGNED_CONTEXT((#185,#187,#188)) \
         REPRESENTATION_CONTEXT('',''));",
    ]
    .join("\n");

    assert_eq!(Units::Inches, detect_length_unit(&scan_entities(&raw)));
}

#[test]
fn global_unit_context_picks_between_length_units() {
    let raw = [
        "#5=( CONVERSION_BASED_UNIT('INCH',#9) LENGTH_UNIT() NAMED_UNIT(#8) );",
        "#6=( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );",
        "#7=( GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNIT_ASSIGNED_CONTEXT((#6)) \
         REPRESENTATION_CONTEXT('',''));",
    ]
    .join("\n");

    assert_eq!(Units::Millimeters, detect_length_unit(&scan_entities(&raw)));
}

#[test]
fn garbage_input_is_a_parse_error() {
    let err = extract_from_str("this is not a STEP file", &ExtractConfig::default())
        .expect_err("garbage must not parse");
    assert!(matches!(
        err,
        GeometryParseError::Syntax(_) | GeometryParseError::NoDataSection
    ));
}
