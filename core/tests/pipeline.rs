use dicom_core::value::PrimitiveValue;
use dicom_core::{DataElement, Tag, VR};
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::{open_file, InMemDicomObject};
use rawtags_core::mapping::defaults::default_mapping;
use rawtags_core::mapping::tags;
use rawtags_core::{ProcessorSettings, TagProcessor, TwixReader};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const PROTOCOL: &str = r#"<XProtocol>
{
  <ParamString."tPatientName">  { "Roe^Jane"  }
  <ParamString."PatientID">  { "PID0042"  }
  <ParamLong."PatientSex">  { 1  }
  <ParamDouble."flPatientAge">  { <Precision> 6  38.700000  }
  <ParamDouble."flPatientHeight">  { <Precision> 6  1680.000000  }
  <ParamString."tProtocolName">  { "t2_tse_cor"  }
  <ParamString."MRAcquisitionType">  { "2D"  }
  <ParamString."Manufacturer">  { "SIEMENS"  }
  <ParamString."DeviceSerialNumber">  { "12345"  }
  <ParamString."FrameOfReference">  { "1.3.12.2.1107.5.2.19.12345.1.20200102030405678.0.0.0"  }
  <ParamLong."TotalScanTimeSec">  { 90  }
}
### ASCCONV BEGIN object=MrProtDataImpl@MrProtocolData ###
alTR[0]	 = 3000000
alTE[0]	 = 98000
sSliceArray.lSize	 = 1
sSliceArray.asSlice[0].dThickness	 = 4
sSliceArray.asSlice[0].dPhaseFOV	 = 220
sSliceArray.asSlice[0].dReadoutFOV	 = 220
sSliceArray.asSlice[0].sNormal.dCor	 = 1
sSliceArray.asSlice[0].sPosition.dCor	 = 12
sKSpace.lBaseResolution	 = 320
### ASCCONV END ###
"#;

/// Newer-generation container holding one measurement
fn container(protocol: &str) -> Vec<u8> {
    const ENTRY_LEN: usize = 152;
    const MEASUREMENT_START: u64 = 512;

    let mut data = Vec::new();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());

    let mut entry = Vec::with_capacity(ENTRY_LEN);
    entry.extend_from_slice(&1u32.to_le_bytes());
    entry.extend_from_slice(&0u32.to_le_bytes());
    entry.extend_from_slice(&MEASUREMENT_START.to_le_bytes());
    entry.extend_from_slice(&0u64.to_le_bytes());
    entry.resize(ENTRY_LEN, 0);
    data.extend_from_slice(&entry);

    data.resize(MEASUREMENT_START as usize, 0);
    data.extend_from_slice(&((4 + protocol.len()) as u32).to_le_bytes());
    data.extend_from_slice(protocol.as_bytes());
    data
}

fn write_slice(path: &Path, sop_instance_uid: &str) {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from("Anonymous"),
    ));
    obj.put(DataElement::new(
        tags::MODALITY,
        VR::CS,
        PrimitiveValue::from("OT"),
    ));
    obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax("1.2.840.10008.1.2.1")
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.4")
            .media_storage_sop_instance_uid(sop_instance_uid),
    )
    .unwrap()
    .write_to_file(path)
    .unwrap();
}

fn setup(slices: &[(u32, u32)]) -> (TempDir, ProcessorSettings) {
    let dir = tempdir().unwrap();
    let input_dir = dir.path().join("input");
    fs::create_dir(&input_dir).unwrap();
    for (series, slice) in slices {
        write_slice(
            &input_dir.join(format!("MR_{}_{}.dcm", series, slice)),
            &format!("1.2.826.0.1.{}.{}", series, slice),
        );
    }

    let raw_file = dir.path().join("meas_MID00042.dat");
    fs::write(&raw_file, container(PROTOCOL)).unwrap();

    let settings = ProcessorSettings {
        input_dir,
        output_dir: dir.path().join("output"),
        raw_file,
        accession_number: Some("A0001".to_string()),
        mode_file: None,
        dynamic_file: None,
    };
    (dir, settings)
}

fn output_file(settings: &ProcessorSettings, series: u32, slice: u32) -> PathBuf {
    settings
        .output_dir
        .join(format!("MR_{}_{}.dcm", series, slice))
}

fn text(path: &Path, tag: Tag) -> String {
    let dcm = open_file(path).unwrap();
    let value = dcm.element(tag).unwrap().to_str().unwrap().into_owned();
    value.trim_end_matches(['\0', ' ']).to_string()
}

#[test]
fn raw_values_parsed_from_multi_measurement_container() {
    let (_dir, settings) = setup(&[]);
    let raw = TwixReader::new().read_file(&settings.raw_file).unwrap();

    assert_eq!(raw.value("PatientName"), "Roe^Jane");
    assert_eq!(raw.value("PatientAge_DCM"), "38Y");
    assert_eq!(raw.value("PatientSex_DCM"), "F");
    assert_eq!(raw.value("StationName"), "MRC12345");
    assert_eq!(raw.value("mrprot.alTE[0]"), "98000");
}

#[test]
fn default_mapping_written_for_every_slice() {
    let (_dir, settings) = setup(&[(1, 1), (1, 2), (2, 1)]);
    let report = TagProcessor::new(settings.clone()).run().unwrap();

    assert!(report.is_success());
    assert_eq!(report.files_written(), 3);

    for (series, slice) in [(1, 1), (1, 2), (2, 1)] {
        let path = output_file(&settings, series, slice);
        let dcm = open_file(&path).unwrap();
        for (tag, _) in default_mapping() {
            assert!(
                dcm.element(tag).is_ok(),
                "{} missing in {}",
                tags::format_tag_path(tag),
                path.display()
            );
        }
    }

    let first = output_file(&settings, 1, 1);
    assert_eq!(text(&first, tags::PATIENT_NAME), "Roe^Jane");
    assert_eq!(text(&first, tags::PATIENT_SEX), "F");
    assert_eq!(text(&first, tags::ACCESSION_NUMBER), "A0001");
    assert_eq!(text(&first, tags::REPETITION_TIME), "3000");
    assert_eq!(text(&first, tags::ECHO_TIME), "98");
    assert_eq!(text(&first, tags::PATIENT_SIZE), "1.68");
    assert_eq!(text(&first, tags::STUDY_DATE), "20200102");
    assert_eq!(text(&first, tags::STUDY_TIME), "030405");
    assert_eq!(
        text(&first, tags::IMAGE_ORIENTATION_PATIENT),
        "1\\0\\0\\0\\0\\-1"
    );
    assert_eq!(text(&first, tags::SLICE_LOCATION), "12");
    assert_eq!(text(&first, tags::INSTANCE_NUMBER), "1");
    assert_eq!(
        text(&output_file(&settings, 1, 2), tags::INSTANCE_NUMBER),
        "2"
    );
    assert_eq!(
        text(&output_file(&settings, 2, 1), tags::SERIES_NUMBER),
        "2"
    );
}

#[test]
fn mode_file_controls_series() {
    let (dir, mut settings) = setup(&[(1, 1), (2, 1), (3, 1)]);
    let mode_file = dir.path().join("mode.ini");
    fs::write(
        &mode_file,
        "[SetDCMTags]\n\
         (0008,0080)=Example Hospital\n\
         SeriesOffset=10\n\
         \n\
         [SetDCMTags_Series2]\n\
         ClearDefaults=TRUE\n\
         (0008,103E)=%EXT(@ProtocolName,_MAP)\n\
         \n\
         [SetDCMTags_Series3]\n\
         Color=TRUE\n",
    )
    .unwrap();
    settings.mode_file = Some(mode_file);

    TagProcessor::new(settings.clone()).run().unwrap();

    let series1 = output_file(&settings, 1, 1);
    assert_eq!(text(&series1, tags::INSTITUTION_NAME), "Example Hospital");
    assert_eq!(text(&series1, tags::SERIES_NUMBER), "11");

    let series2 = output_file(&settings, 2, 1);
    assert_eq!(text(&series2, tags::SERIES_DESCRIPTION), "t2_tse_cor_MAP");
    // Untouched elements of the input survive
    assert_eq!(text(&series2, tags::PATIENT_NAME), "Anonymous");
    assert!(open_file(&series2)
        .unwrap()
        .element(tags::INSTITUTION_NAME)
        .is_err());

    let series3 = output_file(&settings, 3, 1);
    assert_eq!(text(&series3, tags::PHOTOMETRIC_INTERPRETATION), "RGB");
    assert_eq!(
        open_file(&series3)
            .unwrap()
            .element(tags::SAMPLES_PER_PIXEL)
            .unwrap()
            .to_int::<u16>()
            .unwrap(),
        3
    );
    assert_eq!(text(&series3, tags::SERIES_DESCRIPTION), "t2_tse_cor_COLOR");
}
